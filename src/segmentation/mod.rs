mod preprocess;
mod rvm;
pub mod types;
mod worker;

pub use preprocess::InternalResolution;
pub use rvm::RobustVideoMatting;
pub use types::{Mask, SegmentationError, SegmentationProvider};
pub use worker::SegmentationWorker;

use std::path::Path;

/// Create the default segmentation provider (RVM)
pub fn create_default_model(
    model_path: &Path,
    resolution: InternalResolution,
    threshold: f32,
) -> Result<Box<dyn SegmentationProvider>, SegmentationError> {
    let model = RobustVideoMatting::new(model_path, resolution, threshold)?;
    Ok(Box::new(model))
}
