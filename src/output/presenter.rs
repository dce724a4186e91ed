use super::canvas::{draw_scaled, Rect};
use crate::compose::CoverFit;
use image::RgbaImage;

/// Draw `src` over the whole canvas with the cover-fit rule: uniformly
/// scaled, centred, overflow cropped.
pub fn present_cover(canvas: &mut RgbaImage, src: &RgbaImage) -> CoverFit {
    let fit = CoverFit::new(src.dimensions(), canvas.dimensions());
    let _span = tracing::debug_span!("present", scale = fit.scale).entered();

    draw_scaled(
        canvas,
        src,
        Rect {
            x: fit.x,
            y: fit.y,
            width: fit.width,
            height: fit.height,
        },
    );
    fit
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn fills_viewport_without_letterbox() {
        let src = RgbaImage::from_fn(640, 480, |x, _| Rgba([(x / 3) as u8, 0, 0, 255]));
        let mut canvas = RgbaImage::new(300, 400);
        let fit = present_cover(&mut canvas, &src);

        assert!(fit.x < 0.0);
        assert!(canvas.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn crops_symmetrically() {
        // 4x1 source on a 1x1 viewport keeps the middle
        let src = RgbaImage::from_fn(4, 1, |x, _| Rgba([x as u8, 0, 0, 255]));
        let mut canvas = RgbaImage::new(1, 1);
        let fit = present_cover(&mut canvas, &src);

        assert_eq!(fit.scale, 1.0);
        assert_eq!(fit.x, -1.5);
        assert_eq!(canvas.get_pixel(0, 0)[0], 2);
    }
}
