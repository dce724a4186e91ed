use super::canvas;
use super::presenter::present_cover;
use super::OutputSink;
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the frame format so consumers see YUYV at our size
        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        let format = Output::set_format(&device, &requested).context("Failed to set YUYV output format")?;
        if (format.width, format.height) != (width, height) {
            tracing::warn!(
                "Device accepted {}x{} instead of {}x{}",
                format.width,
                format.height,
                width,
                height
            );
        }

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width: format.width,
            height: format.height,
        })
    }
}

/// Cover-fit a viewport frame onto the device size, keeping its aspect ratio.
/// Returns `None` when the sizes already match.
pub(crate) fn fit_to_device(frame: &RgbaImage, (width, height): (u32, u32)) -> Option<RgbaImage> {
    if frame.dimensions() == (width, height) {
        return None;
    }
    let mut fitted = RgbaImage::new(width, height);
    canvas::clear(&mut fitted);
    present_cover(&mut fitted, frame);
    Some(fitted)
}

/// Convert an RGBA frame to YUV422 (YUYV); alpha is ignored
pub(crate) fn rgba_to_yuyv(image: &RgbaImage) -> Vec<u8> {
    let (width, height) = image.dimensions();
    let mut yuyv = Vec::with_capacity((width * height * 2) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let pixel1 = image.get_pixel(x, y);
            let pixel2 = if x + 1 < width { image.get_pixel(x + 1, y) } else { pixel1 };

            let (y1, u1, v1) = rgb_to_yuv(pixel1);
            let (y2, u2, v2) = rgb_to_yuv(pixel2);

            // Average U and V for the pair of pixels
            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            // YUYV format: Y0 U Y1 V
            yuyv.extend_from_slice(&[y1, u, y2, v]);
        }
    }

    yuyv
}

fn rgb_to_yuv(pixel: &Rgba<u8>) -> (u8, u8, u8) {
    let r = pixel[0] as f32;
    let g = pixel[1] as f32;
    let b = pixel[2] as f32;

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbaImage) -> Result<()> {
        let yuyv = match fit_to_device(frame, (self.width, self.height)) {
            Some(fitted) => rgba_to_yuyv(&fitted),
            None => rgba_to_yuyv(frame),
        };

        self.file
            .write_all(&yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_pair() {
        let image = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 0])
            }
        });
        let yuyv = rgba_to_yuyv(&image);
        assert_eq!(yuyv.len(), 4);
        assert_eq!(yuyv[0], 0);
        assert!(yuyv[2] >= 254);
        assert!((127..=128).contains(&yuyv[1]));
        assert!((127..=128).contains(&yuyv[3]));
    }

    #[test]
    fn square_viewport_stays_square_on_wide_device() {
        let white = Rgba([255, 255, 255, 255]);
        let mut frame = RgbaImage::from_pixel(800, 800, Rgba([0, 0, 0, 255]));
        for y in 300..500 {
            for x in 300..500 {
                frame.put_pixel(x, y, white);
            }
        }

        let fitted = fit_to_device(&frame, (1280, 720)).unwrap();
        assert_eq!(fitted.dimensions(), (1280, 720));

        let (mut min_x, mut max_x, mut min_y, mut max_y) = (u32::MAX, 0, u32::MAX, 0);
        for (x, y, pixel) in fitted.enumerate_pixels() {
            if *pixel == white {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
        assert_eq!(max_x - min_x, max_y - min_y);
        assert_eq!(max_x - min_x + 1, 320);
        // horizontally centred on the device
        assert_eq!(min_x + max_x + 1, 1280);
    }

    #[test]
    fn matching_size_is_passed_through() {
        let frame = RgbaImage::new(1280, 720);
        assert!(fit_to_device(&frame, (1280, 720)).is_none());
    }

    #[test]
    fn odd_width_repeats_last_pixel() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([255, 0, 0, 255]));
        let yuyv = rgba_to_yuyv(&image);
        assert_eq!(yuyv.len(), 2 * 2 * 4);
        assert_eq!(yuyv[4], yuyv[6]);
    }
}
