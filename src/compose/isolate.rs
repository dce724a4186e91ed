use super::{ensure_grid, CompositeError, Frame, GRID_WIDTH};
use crate::segmentation::Mask;
use image::RgbaImage;

/// Cut the person out of the camera frame into `out`.
///
/// `out` is cleared to fully transparent; person cells are copied mirrored
/// and made opaque.
pub fn isolate_person(frame: &Frame, mask: &Mask, out: &mut RgbaImage) -> Result<(), CompositeError> {
    ensure_grid("frame", frame.dimensions())?;
    ensure_grid("mask", mask.dimensions())?;
    ensure_grid("person buffer", out.dimensions())?;

    let _span = tracing::debug_span!("isolate").entered();

    let width = GRID_WIDTH as usize;
    let camera = frame.as_raw();
    let out: &mut [u8] = &mut **out;
    out.fill(0);

    for (idx, _) in mask
        .labels()
        .iter()
        .enumerate()
        .filter(|&(_, &label)| label == Mask::PERSON)
    {
        let (x, y) = (idx % width, idx / width);
        let src = idx * 4;
        let dst = (y * width + width - 1 - x) * 4;
        out[dst..dst + 3].copy_from_slice(&camera[src..src + 3]);
        out[dst + 3] = 255;
    }

    Ok(())
}
