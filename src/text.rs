//! Text drawn onto the storyboard: item captions and the customer name.
//!
//! Glyphs are rasterized with fontdue and blended straight onto the canvas
//! with their coverage as alpha.

use std::path::Path;

use fontdue::{Font, FontSettings};
use image::RgbaImage;

use crate::error::AssetLoadError;

/// A parsed font.
#[derive(Debug)]
pub struct Typeface {
    font: Font,
}

impl Typeface {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetLoadError> {
        let path = path.as_ref();
        let fail = |reason: String| AssetLoadError {
            key: path.display().to_string(),
            reason,
        };
        let bytes = std::fs::read(path).map_err(|e| fail(e.to_string()))?;
        Self::from_bytes(&bytes).map_err(|e| fail(e.reason))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetLoadError> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| AssetLoadError {
            key: String::from("font"),
            reason: e.to_string(),
        })?;
        Ok(Self { font })
    }

    /// Advance width of `text` at `px`, rounded up.
    pub fn measure(&self, text: &str, px: f32) -> u32 {
        let width: f32 = text.chars().map(|ch| self.font.metrics(ch, px).advance_width).sum();
        width.max(0.0).ceil() as u32
    }

    /// Draw one line of `text` with the top of its line box at `(x, y)`.
    /// Glyphs falling outside the canvas are clipped.
    pub fn draw(&self, base: &mut RgbaImage, text: &str, x: i64, y: i64, px: f32, color: [u8; 4]) {
        let ascent = self
            .font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent)
            .unwrap_or(px * 0.8);
        let baseline = y as f32 + ascent;
        let mut pen = x as f32;

        for ch in text.chars() {
            let (metrics, coverage) = self.font.rasterize(ch, px);
            let left = (pen + metrics.xmin as f32).round() as i64;
            let top = (baseline - (metrics.ymin + metrics.height as i32) as f32).round() as i64;
            for (i, &c) in coverage.iter().enumerate() {
                if c == 0 {
                    continue;
                }
                let gx = left + (i % metrics.width.max(1)) as i64;
                let gy = top + (i / metrics.width.max(1)) as i64;
                blend(base, gx, gy, color, c);
            }
            pen += metrics.advance_width;
        }
    }
}

/// Source-over of `color` at `coverage` onto one pixel.
fn blend(base: &mut RgbaImage, x: i64, y: i64, color: [u8; 4], coverage: u8) {
    if x < 0 || y < 0 || x >= base.width() as i64 || y >= base.height() as i64 {
        return;
    }
    let a = coverage as u32 * color[3] as u32 / 255;
    let px = base.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        px[c] = ((color[c] as u32 * a + px[c] as u32 * (255 - a)) / 255) as u8;
    }
    px[3] = (a + px[3] as u32 * (255 - a) / 255) as u8;
}
