use crate::compose::Frame;
use anyhow::{ensure, Result};
use image::imageops;
use ndarray::Array4;

/// Resolution hint for the model input, relative to the camera grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InternalResolution {
    Low,
    Medium,
    High,
    Full,
}

impl InternalResolution {
    pub fn factor(self) -> f32 {
        match self {
            InternalResolution::Low => 0.25,
            InternalResolution::Medium => 0.5,
            InternalResolution::High => 0.75,
            InternalResolution::Full => 1.0,
        }
    }

    /// Model input size for a source of `width`x`height`
    pub fn apply(self, width: u32, height: u32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.factor()).round() as u32).max(1);
        (scale(width), scale(height))
    }
}

/// Preprocessor for converting RGBA frames to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess an RGBA frame into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Drop alpha, convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// No horizontal flip is applied; the mask stays in camera space.
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, frame: &Frame) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = if frame.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                frame,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            frame
        };

        let (width, height) = source.dimensions();
        Array4::from_shape_fn((1, 3, height as usize, width as usize), |(_, c, y, x)| {
            source.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        })
    }

    /// Postprocess model output matte back to the frame grid
    ///
    /// # Arguments
    /// * `matte` - Flattened matte at model resolution
    /// * `matte_width` - Width of the matte
    /// * `matte_height` - Height of the matte
    /// * `target_width` - Desired output width
    /// * `target_height` - Desired output height
    ///
    /// Returns: Resized matte flattened in row-major order
    pub fn postprocess_matte(
        matte: &[f32],
        matte_width: u32,
        matte_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Result<Vec<f32>> {
        let _span = tracing::debug_span!("postprocess").entered();

        ensure!(
            matte.len() == (matte_width * matte_height) as usize,
            "matte has {} values for {}x{}",
            matte.len(),
            matte_width,
            matte_height
        );

        // If dimensions match, no resize needed
        if matte_width == target_width && matte_height == target_height {
            return Ok(matte.to_vec());
        }

        // Convert to grayscale image for resizing
        let gray_image = image::GrayImage::from_fn(matte_width, matte_height, |x, y| {
            let idx = (y * matte_width + x) as usize;
            let value = (matte[idx] * 255.0).clamp(0.0, 255.0) as u8;
            image::Luma([value])
        });

        let resized = imageops::resize(
            &gray_image,
            target_width,
            target_height,
            imageops::FilterType::Triangle,
        );

        Ok(resized.pixels().map(|p| p[0] as f32 / 255.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn medium_halves_the_grid() {
        assert_eq!(InternalResolution::Medium.apply(640, 480), (320, 240));
        assert_eq!(InternalResolution::Full.apply(640, 480), (640, 480));
        assert_eq!(InternalResolution::Low.apply(640, 480), (160, 120));
    }

    #[test]
    fn tensor_is_nchw_and_normalized() {
        let frame = Frame::from_fn(4, 2, |x, _| Rgba([255, (x * 60) as u8, 0, 17]));
        let tensor = Preprocessor::new(4, 2).preprocess(&frame);

        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert_eq!(tensor[[0, 0, 1, 3]], 1.0);
        assert_eq!(tensor[[0, 1, 0, 2]], 120.0 / 255.0);
        assert_eq!(tensor[[0, 2, 0, 0]], 0.0);
    }

    #[test]
    fn matte_passes_through_at_target_size() {
        let matte = vec![0.0, 0.5, 1.0, 0.25];
        let out = Preprocessor::postprocess_matte(&matte, 2, 2, 2, 2).unwrap();
        assert_eq!(out, matte);
    }

    #[test]
    fn matte_is_upscaled_to_grid() {
        let matte = vec![1.0; 16];
        let out = Preprocessor::postprocess_matte(&matte, 4, 4, 8, 6).unwrap();
        assert_eq!(out.len(), 48);
        assert!(out.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn matte_size_mismatch_is_an_error() {
        assert!(Preprocessor::postprocess_matte(&[0.0; 3], 2, 2, 4, 4).is_err());
    }
}
