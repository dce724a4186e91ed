use super::preprocess::{InternalResolution, Preprocessor};
use super::types::{Mask, SegmentationError, SegmentationProvider};
use crate::compose::Frame;
use anyhow::{anyhow, Context, Result};
use ndarray::{Array1, Array4, Ix4};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// RobustVideoMatting segmentation model
///
/// This model uses recurrent connections to maintain temporal consistency.
/// Hidden states (r1-r4) are carried between frames for smooth results.
/// The soft alpha matte is thresholded into a binary person mask.
pub struct RobustVideoMatting {
    session: Session,
    preprocessor: Preprocessor,
    width: u32,
    height: u32,
    threshold: f32,

    // Recurrent hidden states
    // These are updated after each inference and fed back in the next frame
    r1: Option<Array4<f32>>,
    r2: Option<Array4<f32>>,
    r3: Option<Array4<f32>>,
    r4: Option<Array4<f32>>,

    // Downsample ratio for hidden states
    downsample_ratio: f32,
}

impl RobustVideoMatting {
    /// Create a new RVM model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `resolution` - Model input size relative to the camera grid
    /// * `threshold` - Matte score above which a cell counts as person
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        resolution: InternalResolution,
        threshold: f32,
    ) -> Result<Self, SegmentationError> {
        Self::load(model_path.as_ref(), resolution, threshold).map_err(SegmentationError::ModelUnavailable)
    }

    fn load(path: &Path, resolution: InternalResolution, threshold: f32) -> Result<Self> {
        tracing::info!("Loading RVM model from {}", path.display());

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!("RVM model loaded successfully");

        let (width, height) = resolution.apply(crate::compose::GRID_WIDTH, crate::compose::GRID_HEIGHT);
        tracing::debug!("Model input {}x{} ({:?})", width, height, resolution);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(width, height),
            width,
            height,
            threshold,
            r1: None,
            r2: None,
            r3: None,
            r4: None,
            downsample_ratio: 0.25,
        })
    }

    /// Initialize hidden states to zeros
    fn init_hidden_states(&mut self) {
        let h = ((self.height as f32 * self.downsample_ratio) as usize).max(8);
        let w = ((self.width as f32 * self.downsample_ratio) as usize).max(8);

        tracing::debug!("Initializing hidden states to {}x{}", w, h);

        self.r1 = Some(Array4::zeros((1, 16, h / 2, w / 2)));
        self.r2 = Some(Array4::zeros((1, 20, h / 4, w / 4)));
        self.r3 = Some(Array4::zeros((1, 40, h / 8, w / 8)));
        self.r4 = Some(Array4::zeros((1, 64, h / 16, w / 16)));
    }

    fn run(&mut self, frame: &Frame) -> Result<Mask> {
        // Initialize hidden states on first frame
        if self.r1.is_none() {
            self.init_hidden_states();
        }

        let state = |r: &Option<Array4<f32>>| -> Result<Tensor<f32>> {
            let r = r.clone().ok_or_else(|| anyhow!("recurrent state missing"))?;
            Ok(Tensor::from_array(r)?)
        };

        // RVM expects: src, r1..r4, downsample_ratio
        let src = Tensor::from_array(self.preprocessor.preprocess(frame))?;
        let (r1, r2, r3, r4) = (state(&self.r1)?, state(&self.r2)?, state(&self.r3)?, state(&self.r4)?);
        let ratio = Tensor::from_array(Array1::from_elem(1, self.downsample_ratio))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![src, r1, r2, r3, r4, ratio])
            .context("Failed to run inference")?;
        drop(_infer_span);

        if outputs.len() < 6 {
            return Err(anyhow!("model returned {} outputs, expected 6", outputs.len()));
        }

        // Outputs: fgr, pha, r1..r4. Only the alpha matte and hidden states are kept.
        let pha = outputs[1].try_extract_array::<f32>()?.to_owned().into_dimensionality::<Ix4>()?;

        let next_state = |i: usize| -> Result<Array4<f32>> {
            Ok(outputs[i].try_extract_array::<f32>()?.to_owned().into_dimensionality::<Ix4>()?)
        };
        let (n1, n2, n3, n4) = (next_state(2)?, next_state(3)?, next_state(4)?, next_state(5)?);
        drop(outputs);

        self.r1 = Some(n1);
        self.r2 = Some(n2);
        self.r3 = Some(n3);
        self.r4 = Some(n4);

        // Matte shape: [1, 1, H, W]
        let (matte_height, matte_width) = (pha.shape()[2], pha.shape()[3]);
        let matte_flat: Vec<f32> = pha.iter().copied().collect();

        let (frame_width, frame_height) = frame.dimensions();
        let matte = Preprocessor::postprocess_matte(
            &matte_flat,
            matte_width as u32,
            matte_height as u32,
            frame_width,
            frame_height,
        )?;

        Ok(Mask::from_matte(&matte, frame_width, frame_height, self.threshold)?)
    }
}

impl SegmentationProvider for RobustVideoMatting {
    fn segment(&mut self, frame: &Frame) -> Result<Mask, SegmentationError> {
        let _span = tracing::debug_span!("rvm_segment").entered();
        self.run(frame).map_err(SegmentationError::Transient)
    }

    fn reset_state(&mut self) {
        tracing::info!("Resetting RVM hidden states");
        self.r1 = None;
        self.r2 = None;
        self.r3 = None;
        self.r4 = None;
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
