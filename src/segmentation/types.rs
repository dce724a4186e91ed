use crate::compose::Frame;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentationError {
    /// The model could not be brought up; segmentation-dependent modes stay off
    #[error("segmentation model unavailable: {0:#}")]
    ModelUnavailable(anyhow::Error),

    /// A single request failed; the previous mask stays in use
    #[error("segmentation attempt failed: {0:#}")]
    Transient(anyhow::Error),

    #[error("mask has {len} labels, expected {width}x{height}")]
    MaskShape { width: u32, height: u32, len: usize },
}

/// Binary person/background labels, one per grid cell, row-major,
/// in raw (unmirrored) camera space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    labels: Vec<u8>,
}

impl Mask {
    pub const BACKGROUND: u8 = 0;
    pub const PERSON: u8 = 1;

    pub fn new(width: u32, height: u32, labels: Vec<u8>) -> Result<Self, SegmentationError> {
        if labels.len() != (width as usize) * (height as usize) {
            return Err(SegmentationError::MaskShape {
                width,
                height,
                len: labels.len(),
            });
        }
        Ok(Self { width, height, labels })
    }

    /// Mask with no person cells
    #[cfg(test)]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![Self::BACKGROUND; (width as usize) * (height as usize)],
        }
    }

    /// Threshold a soft matte: scores strictly above `threshold` are person
    pub fn from_matte(matte: &[f32], width: u32, height: u32, threshold: f32) -> Result<Self, SegmentationError> {
        let labels = matte
            .iter()
            .map(|&score| if score > threshold { Self::PERSON } else { Self::BACKGROUND })
            .collect();
        Self::new(width, height, labels)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    #[cfg(test)]
    pub fn is_person(&self, x: u32, y: u32) -> bool {
        self.labels[(y * self.width + x) as usize] == Self::PERSON
    }

    pub fn person_count(&self) -> usize {
        self.labels.iter().filter(|&&label| label == Self::PERSON).count()
    }
}

/// Trait for segmentation backends
/// Allows swapping the model without touching the compositing core
pub trait SegmentationProvider: Send {
    /// Label every cell of `frame` as person or background
    ///
    /// # Returns
    /// * Mask with the same dimensions as `frame`
    fn segment(&mut self, frame: &Frame) -> Result<Mask, SegmentationError>;

    /// Reset internal state (for models with temporal/recurrent components)
    ///
    /// Call this when:
    /// - Switching cameras
    /// - Restarting after a long stall
    fn reset_state(&mut self) {
        // Default implementation: no-op for stateless models
    }

    /// Get the model's input dimensions after the resolution hint
    ///
    /// Returns (width, height)
    fn input_size(&self) -> (u32, u32);
}

impl<P: SegmentationProvider + ?Sized> SegmentationProvider for Box<P> {
    fn segment(&mut self, frame: &Frame) -> Result<Mask, SegmentationError> {
        (**self).segment(frame)
    }

    fn reset_state(&mut self) {
        (**self).reset_state()
    }

    fn input_size(&self) -> (u32, u32) {
        (**self).input_size()
    }
}
