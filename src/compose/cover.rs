/// Uniform scale-and-crop that fills a viewport while keeping the source
/// aspect ratio. Overflow is cropped, never letterboxed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CoverFit {
    pub fn new((source_width, source_height): (u32, u32), (viewport_width, viewport_height): (u32, u32)) -> Self {
        let (vw, vh) = (viewport_width as f32, viewport_height as f32);
        let scale = (vw / source_width.max(1) as f32).max(vh / source_height.max(1) as f32);
        let width = source_width as f32 * scale;
        let height = source_height as f32 * scale;

        Self {
            scale,
            x: (vw - width) / 2.0,
            y: (vh - height) / 2.0,
            width,
            height,
        }
    }
}
