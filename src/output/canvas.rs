//! Software drawing onto the viewport canvas.

use image::{Pixel, Rgba, RgbaImage};

/// Destination rectangle in viewport pixels; may extend past the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Draw `src` stretched into `rect` with nearest-neighbour sampling.
///
/// Only canvas pixels covered by `rect` are visited, so huge scale factors
/// cost no more than the viewport. Source alpha is blended over the canvas.
pub fn draw_scaled(canvas: &mut RgbaImage, src: &RgbaImage, rect: Rect) {
    let (src_width, src_height) = src.dimensions();
    if src_width == 0 || src_height == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let (canvas_width, canvas_height) = canvas.dimensions();

    let x0 = rect.x.max(0.0).floor() as u32;
    let y0 = rect.y.max(0.0).floor() as u32;
    let x1 = (rect.x + rect.width).min(canvas_width as f32).ceil().max(0.0) as u32;
    let y1 = (rect.y + rect.height).min(canvas_height as f32).ceil().max(0.0) as u32;

    let step_x = src_width as f32 / rect.width;
    let step_y = src_height as f32 / rect.height;

    for y in y0..y1.min(canvas_height) {
        let v = (y as f32 + 0.5 - rect.y) * step_y;
        if v < 0.0 || v >= src_height as f32 {
            continue;
        }
        let sy = v as u32;

        for x in x0..x1.min(canvas_width) {
            let u = (x as f32 + 0.5 - rect.x) * step_x;
            if u < 0.0 || u >= src_width as f32 {
                continue;
            }
            let pixel = src.get_pixel(u as u32, sy);
            match pixel.0[3] {
                0 => {}
                255 => canvas.put_pixel(x, y, *pixel),
                _ => canvas.get_pixel_mut(x, y).blend(pixel),
            }
        }
    }
}

/// Reset the canvas to opaque black
pub fn clear(canvas: &mut RgbaImage) {
    for pixel in canvas.pixels_mut() {
        *pixel = Rgba([0, 0, 0, 255]);
    }
}
