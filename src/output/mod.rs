pub mod canvas;
mod loopback;
mod presenter;

pub use loopback::V4L2Output;
pub use presenter::present_cover;

use anyhow::Result;
use image::RgbaImage;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a viewport frame to the output
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}
