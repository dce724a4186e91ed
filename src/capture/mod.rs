mod v4l_capture;

pub use v4l_capture::WebcamCapture;

use crate::compose::Frame;
use anyhow::Result;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single RGBA frame on the fixed compositing grid
    fn capture_frame(&mut self) -> Result<Frame>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
