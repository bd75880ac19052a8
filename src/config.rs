//! Engine configuration.
//!
//! Loaded once per run (usually from JSON) and read-only afterwards.
//!
//! ```
//! use zenboard::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{
//!     "canvas": { "width": 1000, "height": 800, "dpi": 150 },
//!     "compatibility": { "large": ["support"] }
//! }"#).unwrap();
//! assert_eq!(config.canvas.width, 1000);
//! assert!(!config.render.rotation_enabled);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::geometry::{FracRect, Insets, Rect, Size};
use crate::inventory::Role;

const MM_PER_INCH: f64 = 25.4;

/// Everything the resolver and compositor read during a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: CanvasConfig,
    pub render: RenderConfig,
    /// Roles allowed to stand in for a required role in flexible mode.
    pub compatibility: CompatibilityTable,
    /// Pixels two same-priority slots may overlap before the layout is rejected.
    pub overlap_tolerance_px: u32,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.canvas.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Output canvas: pixel size, resolution, margins and fixed assets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    /// Safe-area margins. Slots are laid out inside them.
    pub margins: Insets,
    /// RGBA background fill.
    pub background: [u8; 4],
    /// Header, footer and logo images composited beneath all items.
    pub assets: Vec<StaticAsset>,
    /// Customer name drawn over the header.
    pub customer: Option<CanvasText>,
}

impl Default for CanvasConfig {
    /// A3 landscape at 300 DPI.
    fn default() -> Self {
        Self {
            width: 4961,
            height: 3508,
            dpi: 300,
            margins: Insets::uniform(177),
            background: [255, 255, 255, 255],
            assets: Vec::new(),
            customer: None,
        }
    }
}

impl CanvasConfig {
    /// Canvas with no margins and no assets.
    pub fn new(width: u32, height: u32, dpi: u32) -> Self {
        Self {
            width,
            height,
            dpi,
            margins: Insets::default(),
            background: [255, 255, 255, 255],
            assets: Vec::new(),
            customer: None,
        }
    }

    /// Derive pixel dimensions from a physical size in millimetres.
    pub fn from_physical_mm(width_mm: f64, height_mm: f64, dpi: u32) -> Self {
        let px = |mm: f64| (mm / MM_PER_INCH * dpi as f64).round().max(0.0) as u32;
        Self::new(px(width_mm), px(height_mm), dpi)
    }

    pub fn margins(mut self, margins: Insets) -> Self {
        self.margins = margins;
        self
    }

    pub fn asset(mut self, asset: StaticAsset) -> Self {
        self.assets.push(asset);
        self
    }

    pub fn customer(mut self, text: CanvasText) -> Self {
        self.customer = Some(text);
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Pixel rect inside the margins.
    pub fn safe_area(&self) -> Rect {
        Rect::from_size(self.size()).inset(&self.margins)
    }

    /// Safe area as canvas fractions.
    pub fn safe_fraction(&self) -> FracRect {
        self.safe_area().to_fraction(self.size())
    }

    pub fn validate(&self) -> core::result::Result<(), ValidationError> {
        if self.width == 0 || self.height == 0 || self.dpi == 0 {
            return Err(ValidationError::DegenerateCanvas {
                width: self.width,
                height: self.height,
                dpi: self.dpi,
            });
        }
        Ok(())
    }
}

/// Horizontal placement of an asset inside its declared area.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A fixed image (header, footer, logo) that bypasses matching.
///
/// The image is stretched to `width_percent` of the area width and the full
/// area height. A missing asset is skipped, never fatal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticAsset {
    /// Loader key of the image.
    pub key: String,
    /// Area on the canvas in pixels.
    pub area: Rect,
    #[serde(default)]
    pub align: AssetAlign,
    #[serde(default = "full_width")]
    pub width_percent: f32,
}

fn full_width() -> f32 {
    100.0
}

impl StaticAsset {
    pub fn new(key: impl Into<String>, area: Rect) -> Self {
        Self {
            key: key.into(),
            area,
            align: AssetAlign::Left,
            width_percent: 100.0,
        }
    }

    pub fn align(mut self, align: AssetAlign, width_percent: f32) -> Self {
        self.align = align;
        self.width_percent = width_percent;
        self
    }

    /// The rect the image is stretched into.
    pub fn target(&self) -> Rect {
        let pct = num_traits::clamp(self.width_percent, 0.0, 100.0) as f64 / 100.0;
        let w = (self.area.width as f64 * pct).round() as u32;
        let x = match self.align {
            AssetAlign::Left => self.area.x,
            AssetAlign::Center => self.area.x + (self.area.width - w) / 2,
            AssetAlign::Right => self.area.x + self.area.width - w,
        };
        Rect::new(x, self.area.y, w, self.area.height)
    }
}

/// A line of text at a fixed canvas position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasText {
    pub text: String,
    /// Top-left corner of the line, in pixels.
    pub origin: (u32, u32),
    #[serde(default = "customer_size")]
    pub size_px: f32,
    #[serde(default = "customer_color")]
    pub color: [u8; 4],
}

fn customer_size() -> f32 {
    80.0
}

fn customer_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

impl CanvasText {
    pub fn new(text: impl Into<String>, origin: (u32, u32)) -> Self {
        Self {
            text: text.into(),
            origin,
            size_px: customer_size(),
            color: customer_color(),
        }
    }

    pub fn style(mut self, size_px: f32, color: [u8; 4]) -> Self {
        self.size_px = size_px;
        self.color = color;
        self
    }
}

/// Compositing options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Honor per-slot rotation hints. Off forces every rotation to zero.
    pub rotation_enabled: bool,
    /// Drop shadow drawn beneath each item. `None` disables shadows.
    pub shadow: Option<ShadowConfig>,
    /// TrueType or OpenType font for item labels and the customer name.
    /// Without one, text is skipped.
    pub font: Option<PathBuf>,
    pub labels: LabelStyle,
}

/// Item caption placement and style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub size_px: f32,
    pub color: [u8; 4],
    /// Space between the bottom of the item and the caption.
    pub gap: u32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            size_px: 35.0,
            color: [120, 120, 120, 255],
            gap: 20,
        }
    }
}

/// Soft drop shadow parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Offset of the shadow from the item, in pixels.
    pub offset: (i32, i32),
    /// Gaussian blur sigma in pixels.
    pub blur_radius: f32,
    /// Shadow color; alpha scales the silhouette.
    pub color: [u8; 4],
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            offset: (15, 15),
            blur_radius: 20.0,
            color: [0, 0, 0, 100],
        }
    }
}

/// Which roles may fill a slot requiring another role in flexible mode.
///
/// Empty by default: flexible matching behaves like strict matching until a
/// table is configured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompatibilityTable {
    substitutes: BTreeMap<Role, Vec<Role>>,
}

impl CompatibilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `substitutes` (in preference order) to fill `required` slots.
    pub fn allow(mut self, required: Role, substitutes: impl IntoIterator<Item = Role>) -> Self {
        let entry = self.substitutes.entry(required).or_default();
        for role in substitutes {
            if role != required && !entry.contains(&role) {
                entry.push(role);
            }
        }
        self
    }

    /// Substitutes for `required`, in preference order.
    pub fn substitutes(&self, required: Role) -> &[Role] {
        self.substitutes
            .get(&required)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.substitutes.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a3_from_physical_size() {
        let c = CanvasConfig::from_physical_mm(420.0, 297.0, 300);
        assert_eq!(c.size(), Size::new(4961, 3508));
    }

    #[test]
    fn safe_area_honors_margins() {
        let c = CanvasConfig::new(1000, 800, 100).margins(Insets::new(100, 50, 20, 50));
        assert_eq!(c.safe_area(), Rect::new(50, 100, 900, 680));
    }

    #[test]
    fn degenerate_canvas_rejected() {
        let err = EngineConfig::from_json_str(r#"{"canvas": {"width": 0}}"#).unwrap_err();
        assert!(err.to_string().contains("degenerate"));
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let c = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(c, EngineConfig::default());
        assert!(c.render.shadow.is_none());
        assert!(c.compatibility.is_empty());
    }

    #[test]
    fn compatibility_table_from_json() {
        let c = EngineConfig::from_json_str(
            r#"{"compatibility": {"large": ["support", "medium"]}, "render": {"shadow": {}}}"#,
        )
        .unwrap();
        assert_eq!(
            c.compatibility.substitutes(Role::Large),
            &[Role::Support, Role::Medium]
        );
        assert!(c.compatibility.substitutes(Role::Hero).is_empty());
        assert_eq!(c.render.shadow, Some(ShadowConfig::default()));
    }

    #[test]
    fn text_settings_from_json() {
        let c = EngineConfig::from_json_str(
            r#"{
                "canvas": {"customer": {"text": "Acme Hotels", "origin": [50, 100]}},
                "render": {"font": "fonts/caption.ttf", "labels": {"gap": 8}}
            }"#,
        )
        .unwrap();
        assert_eq!(c.canvas.customer, Some(CanvasText::new("Acme Hotels", (50, 100))));
        assert_eq!(c.render.font.as_deref(), Some(Path::new("fonts/caption.ttf")));
        assert_eq!(c.render.labels.gap, 8);
        assert_eq!(c.render.labels.size_px, 35.0);
    }

    #[test]
    fn asset_alignment() {
        let area = Rect::new(0, 0, 1000, 200);
        let right = StaticAsset::new("logo", area).align(AssetAlign::Right, 25.0);
        assert_eq!(right.target(), Rect::new(750, 0, 250, 200));
        let center = StaticAsset::new("logo", area).align(AssetAlign::Center, 50.0);
        assert_eq!(center.target(), Rect::new(250, 0, 500, 200));
    }
}
