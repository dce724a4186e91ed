use super::{Bounds, GRID_HEIGHT, GRID_WIDTH};

/// Person height (as a share of the grid) above which they count as close
pub const CLOSE_HEIGHT_RATIO: f32 = 0.6;

/// Staging point on the backdrop, as fractions of the viewport
const ANCHOR_X: f32 = 0.5;
const ANCHOR_Y: f32 = 0.85;

/// Apparent distance of the person from the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    /// Face fills the frame
    Close,
    /// Full body visible
    Far,
}

impl Distance {
    /// Strict `>` against [`CLOSE_HEIGHT_RATIO`]; no smoothing between ticks.
    pub fn classify(bounds: &Bounds) -> Self {
        let height_ratio = bounds.height() as f32 / GRID_HEIGHT as f32;
        if height_ratio > CLOSE_HEIGHT_RATIO {
            Distance::Close
        } else {
            Distance::Far
        }
    }

    /// Target on-screen person height as a share of the viewport height
    fn target_height(self) -> f32 {
        match self {
            Distance::Close => 0.25,
            Distance::Far => 0.4,
        }
    }
}

/// Where and how large to draw the 640x480 isolated-person buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub distance: Distance,
}

pub fn anchor((viewport_width, viewport_height): (u32, u32)) -> (f32, f32) {
    (viewport_width as f32 * ANCHOR_X, viewport_height as f32 * ANCHOR_Y)
}

/// Stage the isolated person on the backdrop.
///
/// Far: the buffer is centred on the anchor. Close: the mirrored bounding
/// box centre sits on the anchor. In both cases the bottom of the box lands
/// on the anchor row.
pub fn place(bounds: &Bounds, viewport: (u32, u32)) -> Placement {
    let distance = Distance::classify(bounds);
    let (anchor_x, anchor_y) = anchor(viewport);

    // a single-row person would otherwise scale to infinity
    let person_height = bounds.height().max(1) as f32;
    let scale = viewport.1 as f32 * distance.target_height() / person_height;

    let width = GRID_WIDTH as f32 * scale;
    let height = GRID_HEIGHT as f32 * scale;

    let x = match distance {
        Distance::Far => anchor_x - width / 2.0,
        Distance::Close => {
            let mirrored_center = (GRID_WIDTH - 1) as f32 - bounds.center_x();
            anchor_x - mirrored_center * scale
        }
    };
    let y = anchor_y - bounds.bottom() as f32 * scale;

    Placement {
        x,
        y,
        width,
        height,
        scale,
        distance,
    }
}
