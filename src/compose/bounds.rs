use crate::segmentation::Mask;

/// Axis-aligned box around every person-labelled cell, in raw grid space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl Bounds {
    /// Horizontal extent, measured as `max_x - min_x`
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    /// Vertical extent, measured as `max_y - min_y`
    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) as f32 / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) as f32 / 2.0
    }

    /// Row of the lowest person cell (`min_y + height`), i.e. the feet
    pub fn bottom(&self) -> u32 {
        self.min_y + self.height()
    }
}

/// Scan the mask once and return the bounding box of person cells.
///
/// Returns `None` when no cell is labelled person.
pub fn extract_bounds(mask: &Mask) -> Option<Bounds> {
    let (width, _) = mask.dimensions();
    let mut bounds: Option<Bounds> = None;

    for (y, row) in mask.labels().chunks_exact(width as usize).enumerate() {
        let Some(first) = row.iter().position(|&label| label == Mask::PERSON) else {
            continue;
        };
        // a row with a first person cell always has a last one
        let last = row.iter().rposition(|&label| label == Mask::PERSON).unwrap_or(first);
        let (first, last, y) = (first as u32, last as u32, y as u32);

        bounds = Some(match bounds {
            None => Bounds {
                min_x: first,
                max_x: last,
                min_y: y,
                max_y: y,
            },
            Some(b) => Bounds {
                min_x: b.min_x.min(first),
                max_x: b.max_x.max(last),
                min_y: b.min_y,
                max_y: y,
            },
        });
    }

    bounds
}
