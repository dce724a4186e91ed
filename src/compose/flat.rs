use super::{ensure_grid, CompositeError, Frame, Mode, GRID_HEIGHT, GRID_WIDTH};
use crate::segmentation::Mask;
use image::RgbaImage;

/// The two modes that select a source per pixel instead of staging the person
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatMode {
    /// Person cells show the background, the rest the camera
    Swap,
    /// Person cells show the camera, the rest the background
    Scene,
}

impl FlatMode {
    pub fn from_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Swap => Some(FlatMode::Swap),
            Mode::Scene => Some(FlatMode::Scene),
            Mode::Summit => None,
        }
    }
}

/// Composite camera and background into `out` according to `mask`.
///
/// Camera pixels are mirrored horizontally on the way into `out`; the mask is
/// read in raw camera space. The background is sampled nearest-neighbour from
/// its native size. When `mask` is `None` the previous content of `out` is
/// kept and `Ok(false)` is returned.
pub fn compose(
    frame: &Frame,
    mask: Option<&Mask>,
    background: &RgbaImage,
    mode: FlatMode,
    out: &mut RgbaImage,
) -> Result<bool, CompositeError> {
    let Some(mask) = mask else {
        return Ok(false);
    };

    ensure_grid("frame", frame.dimensions())?;
    ensure_grid("mask", mask.dimensions())?;
    ensure_grid("output buffer", out.dimensions())?;
    if background.width() == 0 || background.height() == 0 {
        return Err(CompositeError::EmptyBackground);
    }

    let _span = tracing::debug_span!("compose", mode = ?mode).entered();

    let out: &mut [u8] = &mut **out;
    match mode {
        FlatMode::Swap => fill::<false>(frame.as_raw(), mask.labels(), background, out),
        FlatMode::Scene => fill::<true>(frame.as_raw(), mask.labels(), background, out),
    }

    Ok(true)
}

fn fill<const CAMERA_ON_PERSON: bool>(camera: &[u8], labels: &[u8], background: &RgbaImage, out: &mut [u8]) {
    let width = GRID_WIDTH as usize;
    let height = GRID_HEIGHT as usize;
    let (bg_width, bg_height) = (background.width() as usize, background.height() as usize);
    let bg = background.as_raw();

    for (idx, &label) in labels.iter().enumerate() {
        let (x, y) = (idx % width, idx / width);
        let mirror_x = width - 1 - x;

        let src = idx * 4;
        let dst = (y * width + mirror_x) * 4;

        let bg_x = mirror_x * bg_width / width;
        let bg_y = y * bg_height / height;
        let bg_idx = (bg_y * bg_width + bg_x) * 4;

        let rgb = if (label == Mask::PERSON) == CAMERA_ON_PERSON {
            &camera[src..src + 3]
        } else {
            &bg[bg_idx..bg_idx + 3]
        };
        out[dst..dst + 3].copy_from_slice(rgb);
        out[dst + 3] = 255;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn camera() -> Frame {
        Frame::from_fn(GRID_WIDTH, GRID_HEIGHT, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 7, 10]))
    }

    fn background() -> RgbaImage {
        RgbaImage::from_fn(320, 960, |x, y| Rgba([200, (x % 256) as u8, (y % 256) as u8, 0]))
    }

    fn mask_with(cells: &[(u32, u32)]) -> Mask {
        let mut labels = vec![Mask::BACKGROUND; (GRID_WIDTH * GRID_HEIGHT) as usize];
        for &(x, y) in cells {
            labels[(y * GRID_WIDTH + x) as usize] = Mask::PERSON;
        }
        Mask::new(GRID_WIDTH, GRID_HEIGHT, labels).unwrap()
    }

    fn blank() -> RgbaImage {
        RgbaImage::new(GRID_WIDTH, GRID_HEIGHT)
    }

    #[test]
    fn missing_mask_keeps_previous_output() {
        let previous = RgbaImage::from_pixel(GRID_WIDTH, GRID_HEIGHT, Rgba([1, 2, 3, 4]));
        let mut out = previous.clone();
        let filled = compose(&camera(), None, &background(), FlatMode::Swap, &mut out).unwrap();
        assert!(!filled);
        assert_eq!(out, previous);
    }

    #[test]
    fn camera_pixel_lands_mirrored() {
        let (x0, y0) = (10, 20);
        let mask = mask_with(&[(x0, y0)]);
        let frame = camera();
        let mut out = blank();
        compose(&frame, Some(&mask), &background(), FlatMode::Scene, &mut out).unwrap();

        let expected = frame.get_pixel(x0, y0);
        let got = out.get_pixel(GRID_WIDTH - 1 - x0, y0);
        assert_eq!(&got.0[..3], &expected.0[..3]);
        assert_eq!(got.0[3], 255);
    }

    #[test]
    fn swap_keeps_camera_outside_body_mirrored() {
        let (px, py) = (100, 200);
        let (x0, y0) = (10, 20);
        let mask = mask_with(&[(px, py)]);
        let frame = camera();
        let bg = background();
        let mut out = blank();
        compose(&frame, Some(&mask), &bg, FlatMode::Swap, &mut out).unwrap();

        let expected = frame.get_pixel(x0, y0);
        let got = out.get_pixel(GRID_WIDTH - 1 - x0, y0);
        assert_eq!(&got.0[..3], &expected.0[..3]);
        assert_eq!(got.0[3], 255);

        // the single person cell shows the scene image instead
        // column 539: bg x = floor(539 * 320 / 640) = 269, row 200: bg y = 400
        let body = out.get_pixel(GRID_WIDTH - 1 - px, py);
        assert_eq!(&body.0[..3], &bg.get_pixel(269, 400).0[..3]);
        assert_eq!(body.0[3], 255);
    }

    #[test]
    fn background_is_nearest_sampled_in_mirrored_space() {
        let mask = Mask::empty(GRID_WIDTH, GRID_HEIGHT);
        let bg = background();
        let mut out = blank();
        compose(&camera(), Some(&mask), &bg, FlatMode::Scene, &mut out).unwrap();

        // destination column 101 is mirror column 101: bg x = floor(101 * 320 / 640) = 50
        // row 33: bg y = floor(33 * 960 / 480) = 66
        let got = out.get_pixel(101, 33);
        let expected = bg.get_pixel(50, 66);
        assert_eq!(&got.0[..3], &expected.0[..3]);
        assert_eq!(got.0[3], 255);
    }

    #[test]
    fn swap_and_scene_are_complements() {
        let cells: Vec<(u32, u32)> = (100..200).flat_map(|y| (300..360).map(move |x| (x, y))).collect();
        let mask = mask_with(&cells);
        let frame = camera();
        let bg = background();

        let mut swap = blank();
        let mut scene = blank();
        let mut camera_only = blank();
        compose(&frame, Some(&mask), &bg, FlatMode::Swap, &mut swap).unwrap();
        compose(&frame, Some(&mask), &bg, FlatMode::Scene, &mut scene).unwrap();
        // an all-person scene render is the mirrored camera everywhere
        let all_person = Mask::new(GRID_WIDTH, GRID_HEIGHT, vec![Mask::PERSON; (GRID_WIDTH * GRID_HEIGHT) as usize]).unwrap();
        compose(&frame, Some(&all_person), &bg, FlatMode::Scene, &mut camera_only).unwrap();

        for y in 0..GRID_HEIGHT {
            for x in 0..GRID_WIDTH {
                let dst_x = GRID_WIDTH - 1 - x;
                let is_person = mask.is_person(x, y);
                let cam = camera_only.get_pixel(dst_x, y);
                let (s, c) = (swap.get_pixel(dst_x, y), scene.get_pixel(dst_x, y));
                if is_person {
                    assert_eq!(c, cam);
                    assert_ne!(s, cam);
                } else {
                    assert_eq!(s, cam);
                    assert_ne!(c, cam);
                }
            }
        }
    }

    #[test]
    fn composing_twice_is_identical() {
        let mask = mask_with(&[(0, 0), (320, 240), (639, 479)]);
        let frame = camera();
        let bg = background();
        let mut first = blank();
        let mut second = RgbaImage::from_pixel(GRID_WIDTH, GRID_HEIGHT, Rgba([9, 9, 9, 9]));
        compose(&frame, Some(&mask), &bg, FlatMode::Swap, &mut first).unwrap();
        compose(&frame, Some(&mask), &bg, FlatMode::Swap, &mut second).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn rejects_off_grid_frame() {
        let frame = Frame::new(320, 240);
        let mask = Mask::empty(GRID_WIDTH, GRID_HEIGHT);
        let mut out = blank();
        let err = compose(&frame, Some(&mask), &background(), FlatMode::Swap, &mut out).unwrap_err();
        assert!(matches!(err, CompositeError::DimensionMismatch { what: "frame", .. }));
    }

    #[test]
    fn rejects_empty_background() {
        let mask = Mask::empty(GRID_WIDTH, GRID_HEIGHT);
        let mut out = blank();
        let err = compose(&camera(), Some(&mask), &RgbaImage::new(0, 0), FlatMode::Scene, &mut out).unwrap_err();
        assert_eq!(err, CompositeError::EmptyBackground);
    }
}
