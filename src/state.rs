//! State shared between the display loop, the segmentation worker and the
//! control thread. The mask is only ever replaced whole; readers take one
//! snapshot per tick.

use crate::compose::Mode;
use crate::segmentation::Mask;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Largest accepted viewport edge (8K UHD width)
pub const MAX_VIEWPORT_EDGE: u32 = 7680;

/// Clamp a viewport edge to `1..=MAX_VIEWPORT_EDGE`
pub fn clamp_viewport((width, height): (u32, u32)) -> (u32, u32) {
    (width.clamp(1, MAX_VIEWPORT_EDGE), height.clamp(1, MAX_VIEWPORT_EDGE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelStatus {
    Loading,
    Ready,
    Unavailable,
}

impl ModelStatus {
    fn to_u8(self) -> u8 {
        match self {
            ModelStatus::Loading => 0,
            ModelStatus::Ready => 1,
            ModelStatus::Unavailable => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ModelStatus::Ready,
            2 => ModelStatus::Unavailable,
            _ => ModelStatus::Loading,
        }
    }
}

/// Consistent view of the shared state for one display tick
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub mask: Option<Arc<Mask>>,
    pub mode: Mode,
    pub status: ModelStatus,
    pub viewport: (u32, u32),
}

#[derive(Debug)]
pub struct SharedState {
    mask: RwLock<Option<Arc<Mask>>>,
    mode: AtomicU8,
    status: AtomicU8,
    viewport_width: AtomicU32,
    viewport_height: AtomicU32,
}

impl SharedState {
    pub fn new(mode: Mode, viewport: (u32, u32)) -> Arc<Self> {
        let viewport = clamp_viewport(viewport);
        Arc::new(Self {
            mask: RwLock::new(None),
            mode: AtomicU8::new(mode.to_u8()),
            status: AtomicU8::new(ModelStatus::Loading.to_u8()),
            viewport_width: AtomicU32::new(viewport.0),
            viewport_height: AtomicU32::new(viewport.1),
        })
    }

    /// Replace the latest mask. Only the segmentation worker writes here.
    pub fn publish_mask(&self, mask: Mask) {
        let mask = Arc::new(mask);
        *self.mask.write().unwrap_or_else(PoisonError::into_inner) = Some(mask);
    }

    pub fn latest_mask(&self) -> Option<Arc<Mask>> {
        self.mask.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.store(mode.to_u8(), Ordering::Relaxed);
    }

    pub fn mode(&self) -> Mode {
        Mode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_status(&self, status: ModelStatus) {
        self.status.store(status.to_u8(), Ordering::Release);
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_viewport(&self, viewport: (u32, u32)) {
        let (width, height) = clamp_viewport(viewport);
        self.viewport_width.store(width, Ordering::Relaxed);
        self.viewport_height.store(height, Ordering::Relaxed);
    }

    pub fn viewport(&self) -> (u32, u32) {
        (
            self.viewport_width.load(Ordering::Relaxed),
            self.viewport_height.load(Ordering::Relaxed),
        )
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mask: self.latest_mask(),
            mode: self.mode(),
            status: self.status(),
            viewport: self.viewport(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_loading_without_mask() {
        let state = SharedState::new(Mode::Summit, (1280, 720));
        let snap = state.snapshot();
        assert!(snap.mask.is_none());
        assert_eq!(snap.status, ModelStatus::Loading);
        assert_eq!(snap.mode, Mode::Summit);
        assert_eq!(snap.viewport, (1280, 720));
    }

    #[test]
    fn snapshot_is_stable_after_publish() {
        let state = SharedState::new(Mode::Swap, (640, 480));
        state.publish_mask(Mask::empty(2, 2));
        let snap = state.snapshot();

        state.publish_mask(Mask::new(2, 2, vec![1, 1, 1, 1]).unwrap());
        assert_eq!(snap.mask.as_deref(), Some(&Mask::empty(2, 2)));
        assert_eq!(state.latest_mask().map(|m| m.person_count()), Some(4));
    }

    #[test]
    fn viewport_never_collapses_to_zero() {
        let state = SharedState::new(Mode::Scene, (640, 480));
        state.set_viewport((0, 300));
        assert_eq!(state.viewport(), (1, 300));
    }

    #[test]
    fn viewport_is_capped_on_every_path() {
        let state = SharedState::new(Mode::Scene, (0, 100_000));
        assert_eq!(state.viewport(), (1, MAX_VIEWPORT_EDGE));

        state.set_viewport((100_000, 100_000));
        assert_eq!(state.viewport(), (MAX_VIEWPORT_EDGE, MAX_VIEWPORT_EDGE));
    }

    #[test]
    fn status_round_trips() {
        let state = SharedState::new(Mode::Scene, (640, 480));
        state.set_status(ModelStatus::Unavailable);
        assert_eq!(state.status(), ModelStatus::Unavailable);
        state.set_mode(Mode::Summit);
        assert_eq!(state.mode(), Mode::Summit);
    }
}
