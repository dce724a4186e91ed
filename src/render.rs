//! One display tick: pick the pipeline for the active mode and draw the
//! viewport canvas.

use crate::compose::{
    compose, extract_bounds, isolate_person, place, CompositeError, FlatMode, Frame, GRID_HEIGHT, GRID_WIDTH,
};
use crate::output::canvas::{self, draw_scaled, Rect};
use crate::output::present_cover;
use crate::state::{ModelStatus, Snapshot};
use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Static background images, one per mode
pub struct Backgrounds {
    pub swap: RgbaImage,
    pub scene: RgbaImage,
    pub summit: RgbaImage,
}

impl Backgrounds {
    pub fn load(swap: &Path, scene: &Path, summit: &Path) -> Result<Self> {
        Ok(Self {
            swap: load_image(swap)?,
            scene: load_image(scene)?,
            summit: load_image(summit)?,
        })
    }

    fn for_flat(&self, mode: FlatMode) -> &RgbaImage {
        match mode {
            FlatMode::Swap => &self.swap,
            FlatMode::Scene => &self.scene,
        }
    }
}

fn load_image(path: &Path) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to load background {}", path.display()))?
        .to_rgba8();
    tracing::info!("Loaded background {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

/// What the last tick drew
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Model not ready, canvas left black
    Waiting,
    /// Flat mode; `false` when the previous composite was reused
    Flat { fresh: bool },
    /// Summit backdrop, with or without the staged person
    Summit { person: bool },
}

pub struct Renderer {
    backgrounds: Backgrounds,
    // persists across ticks so a missing mask keeps the last composite
    result: RgbaImage,
    person: RgbaImage,
    canvas: RgbaImage,
}

impl Renderer {
    pub fn new(backgrounds: Backgrounds) -> Self {
        Self {
            backgrounds,
            result: RgbaImage::from_pixel(GRID_WIDTH, GRID_HEIGHT, Rgba([0, 0, 0, 255])),
            person: RgbaImage::new(GRID_WIDTH, GRID_HEIGHT),
            canvas: RgbaImage::new(1, 1),
        }
    }

    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn render(&mut self, frame: &Frame, snapshot: &Snapshot) -> Result<TickOutcome, CompositeError> {
        if self.canvas.dimensions() != snapshot.viewport {
            let (width, height) = snapshot.viewport;
            tracing::debug!("Viewport resized to {}x{}", width, height);
            self.canvas = RgbaImage::new(width, height);
        }
        canvas::clear(&mut self.canvas);

        if snapshot.status != ModelStatus::Ready {
            return Ok(TickOutcome::Waiting);
        }

        let mask = snapshot.mask.as_deref();
        match FlatMode::from_mode(snapshot.mode) {
            Some(flat) => {
                let background = self.backgrounds.for_flat(flat);
                let fresh = compose(frame, mask, background, flat, &mut self.result)?;
                present_cover(&mut self.canvas, &self.result);
                Ok(TickOutcome::Flat { fresh })
            }
            None => self.render_summit(frame, snapshot),
        }
    }

    fn render_summit(&mut self, frame: &Frame, snapshot: &Snapshot) -> Result<TickOutcome, CompositeError> {
        present_cover(&mut self.canvas, &self.backgrounds.summit);

        let Some(mask) = snapshot.mask.as_deref() else {
            return Ok(TickOutcome::Summit { person: false });
        };
        let Some(bounds) = extract_bounds(mask) else {
            return Ok(TickOutcome::Summit { person: false });
        };

        isolate_person(frame, mask, &mut self.person)?;
        let placement = place(&bounds, snapshot.viewport);
        tracing::trace!(
            ?placement,
            width = bounds.width(),
            height = bounds.height(),
            center_y = bounds.center_y(),
            "Staging person"
        );

        draw_scaled(
            &mut self.canvas,
            &self.person,
            Rect {
                x: placement.x,
                y: placement.y,
                width: placement.width,
                height: placement.height,
            },
        );
        Ok(TickOutcome::Summit { person: true })
    }
}
