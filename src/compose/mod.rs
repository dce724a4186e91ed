//! Per-frame compositing core: bounds extraction, the two flat modes,
//! person isolation and placement for summit mode, and the cover-fit rule.

mod bounds;
mod cover;
mod flat;
mod isolate;
mod placement;

pub use bounds::{extract_bounds, Bounds};
pub use cover::CoverFit;
pub use flat::{compose, FlatMode};
pub use isolate::isolate_person;
pub use placement::place;

use image::RgbaImage;
use thiserror::Error;

/// Width of the shared camera/mask/output grid
pub const GRID_WIDTH: u32 = 640;

/// Height of the shared camera/mask/output grid
pub const GRID_HEIGHT: u32 = 480;

/// Camera frame in raw (unmirrored) capture space
pub type Frame = RgbaImage;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompositeError {
    #[error("{what} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        what: &'static str,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("background image has no pixels")]
    EmptyBackground,
}

pub(crate) fn ensure_grid(what: &'static str, (width, height): (u32, u32)) -> Result<(), CompositeError> {
    if (width, height) == (GRID_WIDTH, GRID_HEIGHT) {
        Ok(())
    } else {
        Err(CompositeError::DimensionMismatch {
            what,
            expected_width: GRID_WIDTH,
            expected_height: GRID_HEIGHT,
            actual_width: width,
            actual_height: height,
        })
    }
}

/// Active rendering mode, selected externally at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Body shows the background, the rest shows the camera
    Swap,
    /// Body shows the camera, the rest shows the background
    Scene,
    /// Person is cut out and staged on a fixed backdrop
    Summit,
}

impl Mode {
    /// Parse a mode name from the control channel.
    ///
    /// Unrecognised names fall through to `Scene`, the default flat mode.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "swap" => Mode::Swap,
            "summit" => Mode::Summit,
            "scene" => Mode::Scene,
            other => {
                tracing::warn!("Unknown mode '{}', falling back to scene", other);
                Mode::Scene
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Swap => "swap",
            Mode::Scene => "scene",
            Mode::Summit => "summit",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Mode::Swap => 0,
            Mode::Scene => 1,
            Mode::Summit => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Mode::Swap,
            2 => Mode::Summit,
            _ => Mode::Scene,
        }
    }
}
