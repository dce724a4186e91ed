use super::CaptureSource;
use crate::compose::{Frame, GRID_HEIGHT, GRID_WIDTH};
use anyhow::{Context, Result};
use image::imageops;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

pub struct WebcamCapture {
    camera: Camera,
}

impl WebcamCapture {
    /// Open the camera asking for the grid resolution. Devices that deliver
    /// another size are resized on every frame.
    pub fn new(device_index: u32) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            device_index,
            GRID_WIDTH,
            GRID_HEIGHT
        );

        let index = CameraIndex::Index(device_index);
        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(GRID_WIDTH, GRID_HEIGHT),
        ));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let native = camera.resolution();
        if (native.width(), native.height()) != (GRID_WIDTH, GRID_HEIGHT) {
            tracing::info!(
                "Camera delivers {}x{}, frames will be resized",
                native.width(),
                native.height()
            );
        }

        tracing::info!("Webcam initialized successfully");

        Ok(Self { camera })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<Frame> {
        let frame = self.camera.frame().context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbAFormat>()
            .context("Failed to decode frame")?;

        if decoded.dimensions() == (GRID_WIDTH, GRID_HEIGHT) {
            Ok(decoded)
        } else {
            Ok(imageops::resize(
                &decoded,
                GRID_WIDTH,
                GRID_HEIGHT,
                imageops::FilterType::Triangle,
            ))
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (GRID_WIDTH, GRID_HEIGHT)
    }
}
