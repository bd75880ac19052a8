//! Raster compositing of a resolved layout.
//!
//! Static assets go down first, then the customer name, then every
//! assignment in ascending z: the item is scaled to its fit rectangle,
//! optionally rotated, preceded by its drop shadow, alpha-blended onto the
//! canvas and captioned.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::config::{CanvasConfig, RenderConfig, ShadowConfig};
use crate::error::{AssetLoadError, Result};
use crate::resolve::ResolvedAssignment;
use crate::text::Typeface;

const RESIZE_FILTER: FilterType = FilterType::Lanczos3;
const METERS_PER_INCH: f64 = 0.0254;

/// Source of item and asset pixels, by key.
pub trait ImageLoader {
    fn load(&self, key: &str) -> core::result::Result<RgbaImage, AssetLoadError>;
}

/// Images held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    images: HashMap<String, RgbaImage>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, image: RgbaImage) {
        self.images.insert(key.into(), image);
    }

    pub fn with(mut self, key: impl Into<String>, image: RgbaImage) -> Self {
        self.insert(key, image);
        self
    }
}

impl ImageLoader for MemoryLoader {
    fn load(&self, key: &str) -> core::result::Result<RgbaImage, AssetLoadError> {
        self.images.get(key).cloned().ok_or_else(|| AssetLoadError {
            key: key.to_string(),
            reason: String::from("not in memory loader"),
        })
    }
}

/// Images decoded from files in one directory.
///
/// A key resolves to `dir/key` if that file exists, otherwise to the first of
/// `dir/key.{png,jpg,jpeg,webp}` that does.
#[derive(Clone, Debug)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    const EXTENSIONS: [&'static str; 4] = ["png", "jpg", "jpeg", "webp"];

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        let exact = self.dir.join(key);
        if exact.is_file() {
            return Some(exact);
        }
        Self::EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{key}.{ext}")))
            .find(|p| p.is_file())
    }
}

impl ImageLoader for DirectoryLoader {
    fn load(&self, key: &str) -> core::result::Result<RgbaImage, AssetLoadError> {
        let fail = |reason: String| AssetLoadError {
            key: key.to_string(),
            reason,
        };
        let path = self
            .path_for(key)
            .ok_or_else(|| fail(format!("no file in {}", self.dir.display())))?;
        // The decoder and its file handle are dropped before this returns.
        let image = image::open(&path).map_err(|e| fail(format!("{}: {e}", path.display())))?;
        Ok(image.to_rgba8())
    }
}

/// The finished composite.
#[derive(Clone, Debug)]
pub struct Storyboard {
    pub image: RgbaImage,
    /// Print resolution of the canvas. Written into PNG output.
    pub dpi: u32,
}

impl Storyboard {
    /// Encode by file extension. PNG files carry the DPI in their `pHYs`
    /// chunk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png {
            self.write_png(path)?;
        } else {
            self.image.save(path)?;
        }
        tracing::info!(
            "saved storyboard {}×{} @ {} DPI to {}",
            self.image.width(),
            self.image.height(),
            self.dpi,
            path.display()
        );
        Ok(())
    }

    fn write_png(&self, path: &Path) -> Result<()> {
        let ppm = (self.dpi as f64 / METERS_PER_INCH).round() as u32;
        let out = BufWriter::new(File::create(path)?);
        let mut encoder = png::Encoder::new(out, self.image.width(), self.image.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(self.image.as_raw())?;
        writer.finish()?;
        Ok(())
    }
}

/// Composite `assignments` onto a fresh canvas.
///
/// A missing item image fails the run. A missing static asset, or a missing
/// font when text is configured, is skipped with a warning.
pub fn render(
    canvas: &CanvasConfig,
    options: &RenderConfig,
    assignments: &[ResolvedAssignment],
    loader: &dyn ImageLoader,
) -> Result<Storyboard> {
    canvas.validate()?;
    let mut base = RgbaImage::from_pixel(canvas.width, canvas.height, Rgba(canvas.background));

    let typeface = load_typeface(canvas, options, assignments);

    for asset in &canvas.assets {
        let target = asset.target();
        if target.width == 0 || target.height == 0 {
            continue;
        }
        match loader.load(&asset.key) {
            Ok(img) => {
                let stretched = imageops::resize(&img, target.width, target.height, RESIZE_FILTER);
                imageops::overlay(&mut base, &stretched, target.x as i64, target.y as i64);
            }
            Err(e) => tracing::warn!("skipping static asset: {e}"),
        }
    }

    if let (Some(face), Some(customer)) = (&typeface, &canvas.customer) {
        let (x, y) = customer.origin;
        face.draw(&mut base, &customer.text, x as i64, y as i64, customer.size_px, customer.color);
    }

    let mut ordered: Vec<&ResolvedAssignment> = assignments.iter().collect();
    ordered.sort_by_key(|a| a.z);

    for a in ordered {
        let fitted = a.fitted();
        if fitted.width == 0 || fitted.height == 0 {
            tracing::warn!("slot '{}' has no room for '{}'", a.slot_name, a.item.key);
            continue;
        }
        let sprite = {
            let source = loader.load(&a.item.key)?;
            imageops::resize(&source, fitted.width, fitted.height, RESIZE_FILTER)
        };
        let angle = a.effective_rotation(options);
        let sprite = if angle == 0.0 { sprite } else { rotate_bilinear(&sprite, angle) };

        // Keep the sprite centered on the fit rectangle even when rotation grew it.
        let x = fitted.x as i64 + (fitted.width as i64 - sprite.width() as i64) / 2;
        let y = fitted.y as i64 + (fitted.height as i64 - sprite.height() as i64) / 2;

        if let Some(shadow) = &options.shadow {
            draw_shadow(&mut base, &sprite, x, y, shadow);
        }
        imageops::overlay(&mut base, &sprite, x, y);

        if let (Some(face), Some(label)) = (&typeface, &a.item.label) {
            let style = &options.labels;
            let width = face.measure(label, style.size_px) as i64;
            let lx = fitted.x as i64 + (fitted.width as i64 - width) / 2;
            let ly = fitted.bottom() as i64 + style.gap as i64;
            face.draw(&mut base, label, lx, ly, style.size_px, style.color);
        }
    }

    Ok(Storyboard {
        image: base,
        dpi: canvas.dpi,
    })
}

/// The font for this render, if any text is to be drawn. A missing or broken
/// font drops the text, never the render.
fn load_typeface(
    canvas: &CanvasConfig,
    options: &RenderConfig,
    assignments: &[ResolvedAssignment],
) -> Option<Typeface> {
    let wants_text = canvas.customer.is_some() || assignments.iter().any(|a| a.item.label.is_some());
    if !wants_text {
        return None;
    }
    let Some(path) = &options.font else {
        tracing::warn!("text requested but no font configured; skipping it");
        return None;
    };
    match Typeface::load(path) {
        Ok(face) => Some(face),
        Err(e) => {
            tracing::warn!("skipping text: {e}");
            None
        }
    }
}

/// Blurred, offset, tinted silhouette of `sprite` drawn at `(x, y)`.
/// Only coverage is blurred; the tint is flat across the shadow.
fn draw_shadow(base: &mut RgbaImage, sprite: &RgbaImage, x: i64, y: i64, shadow: &ShadowConfig) {
    let sigma = shadow.blur_radius.max(0.0);
    let pad = (sigma * 3.0).ceil() as u32;
    let [r, g, b, alpha] = shadow.color;

    let mut mask = GrayImage::new(sprite.width() + 2 * pad, sprite.height() + 2 * pad);
    for (sx, sy, px) in sprite.enumerate_pixels() {
        mask.put_pixel(sx + pad, sy + pad, Luma([px[3]]));
    }
    let mask = if sigma > 0.0 { imageops::blur(&mask, sigma) } else { mask };
    let silhouette = RgbaImage::from_fn(mask.width(), mask.height(), |mx, my| {
        let a = mask.get_pixel(mx, my)[0] as u32 * alpha as u32 / 255;
        Rgba([r, g, b, a as u8])
    });
    imageops::overlay(
        base,
        &silhouette,
        x + shadow.offset.0 as i64 - pad as i64,
        y + shadow.offset.1 as i64 - pad as i64,
    );
}

/// Rotate clockwise by `degrees` about the center with bilinear sampling.
/// The output grows to hold the whole rotated image; uncovered pixels are
/// transparent.
pub fn rotate_bilinear(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let theta = (degrees as f64).to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (src.width() as f64, src.height() as f64);
    // Shave float noise so a quarter turn of 40×20 is 20×40, not 21×41.
    let out_w = ((w * cos.abs() + h * sin.abs()) - 1e-6).ceil().max(1.0) as u32;
    let out_h = ((w * sin.abs() + h * cos.abs()) - 1e-6).ceil().max(1.0) as u32;

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out_w as f64 / 2.0, out_h as f64 / 2.0);
    let mut out = RgbaImage::new(out_w, out_h);
    for (ox, oy, px) in out.enumerate_pixels_mut() {
        let dx = ox as f64 + 0.5 - ocx;
        let dy = oy as f64 + 0.5 - ocy;
        let sx = dx * cos + dy * sin + cx;
        let sy = -dx * sin + dy * cos + cy;
        *px = sample_bilinear(src, sx, sy);
    }
    out
}

/// Sample at continuous coordinates (pixel centers at `i + 0.5`). Blends in
/// premultiplied space; outside pixels are transparent.
fn sample_bilinear(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let fx = x - 0.5;
    let fy = y - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;

    let mut acc = [0.0f64; 4];
    for (ix, iy, weight) in [
        (x0, y0, (1.0 - tx) * (1.0 - ty)),
        (x0 + 1.0, y0, tx * (1.0 - ty)),
        (x0, y0 + 1.0, (1.0 - tx) * ty),
        (x0 + 1.0, y0 + 1.0, tx * ty),
    ] {
        if weight <= 0.0 || ix < 0.0 || iy < 0.0 || ix >= src.width() as f64 || iy >= src.height() as f64 {
            continue;
        }
        let p = src.get_pixel(ix as u32, iy as u32);
        let a = p[3] as f64 * weight;
        acc[0] += p[0] as f64 * a;
        acc[1] += p[1] as f64 * a;
        acc[2] += p[2] as f64 * a;
        acc[3] += a;
    }
    if acc[3] <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let un = |c: f64| (c / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([un(acc[0]), un(acc[1]), un(acc[2]), acc[3].round().clamp(0.0, 255.0) as u8])
}
