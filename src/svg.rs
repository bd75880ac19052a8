//! SVG preview of a resolved layout.
//!
//! Draws the canvas, its safe area and every assignment (slot outline plus
//! fitted item) in paint order, labeled with item key, role and z. A debugging
//! aid; no pixel data is involved.
//!
//! # Example
//!
//! ```
//! use zenboard::config::CanvasConfig;
//! use zenboard::inventory::{Inventory, Role};
//! use zenboard::layout::LayoutDescription;
//! use zenboard::resolve::{MatchMode, Resolver};
//! use zenboard::svg::render_resolution_svg;
//! use zenboard::tree::{Axis, LayoutNode};
//! use zenboard::{EngineConfig, TemplateLibrary};
//!
//! let config = EngineConfig { canvas: CanvasConfig::new(1000, 1000, 300), ..Default::default() };
//! let library = TemplateLibrary::default();
//! let inventory = Inventory::new()
//!     .with_many(Role::Hero, 1, 1000, 2000).unwrap()
//!     .with_many(Role::Small, 1, 500, 500).unwrap();
//! let tree = LayoutNode::split(Axis::Horizontal, [
//!     (0.6, LayoutNode::leaf(Role::Hero)),
//!     (0.4, LayoutNode::leaf(Role::Small)),
//! ]);
//! let resolution = Resolver::new(&config, &library)
//!     .resolve(&LayoutDescription::Proposed(tree), &inventory, MatchMode::Strict)
//!     .unwrap();
//!
//! let svg = render_resolution_svg(&config.canvas, &resolution);
//! assert!(svg.starts_with("<svg"));
//! ```

use crate::config::CanvasConfig;
use crate::geometry::Rect;
use crate::inventory::RoleGroup;
use crate::resolve::Resolution;

/// Maximum drawn canvas width.
const MAX_PANEL_W: f64 = 600.0;
/// Maximum drawn canvas height.
const MAX_PANEL_H: f64 = 420.0;
const MARGIN_X: f64 = 40.0;
const MARGIN_TOP: f64 = 30.0;
/// Height of the title above the panel.
const LABEL_H: f64 = 22.0;
/// Space below the panel for the annotation line.
const FOOTER_H: f64 = 30.0;

/// Render a complete SVG document for `resolution` on `canvas`.
pub fn render_resolution_svg(canvas: &CanvasConfig, resolution: &Resolution) -> String {
    let (pw, ph, scale) = scale_to_fit(canvas.width, canvas.height);
    let total_w = pw.max(MAX_PANEL_W) + 2.0 * MARGIN_X;
    let total_h = MARGIN_TOP + LABEL_H + ph + FOOTER_H;
    let px = (total_w - pw) / 2.0;
    let py = MARGIN_TOP + LABEL_H;
    let center_x = total_w / 2.0;

    let mut svg = String::with_capacity(4096);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
        total_w as u32, total_h as u32, total_w, total_h
    ));
    svg.push('\n');

    // Style: light/dark mode via prefers-color-scheme
    svg.push_str(
        r##"<style>
  text { font-family: "Consolas", "DejaVu Sans Mono", "Courier New", monospace; }
  .label { font-size: 13px; font-weight: bold; fill: #333; }
  .annotation { font-size: 11px; fill: #666; }
  .item-label { font-size: 10px; fill: #222; }
  .outer { fill: #f4f4f4; stroke: #999; stroke-width: 1; }
  .safe { fill: none; stroke: #bbb; stroke-width: 1; stroke-dasharray: 4,2; }
  .slot { fill: none; stroke: #888; stroke-width: 1; stroke-dasharray: 2,2; }
  .hero { fill: #6ba3d6; stroke: #2c6faa; stroke-width: 1.5; fill-opacity: 0.85; }
  .support { fill: #8cc98a; stroke: #3f8a3c; stroke-width: 1.5; fill-opacity: 0.85; }
  .accessory { fill: #e7b46a; stroke: #a66f1c; stroke-width: 1.5; fill-opacity: 0.85; }
  @media (prefers-color-scheme: dark) {
    .label { fill: #e0e0e0; }
    .annotation { fill: #aaa; }
    .item-label { fill: #eee; }
    .outer { fill: #2d2d2d; stroke: #555; }
    .safe { stroke: #666; }
    .slot { stroke: #777; }
    .hero { fill: #3a72a4; stroke: #5a9fd4; }
    .support { fill: #3f7a3d; stroke: #6cb96a; }
    .accessory { fill: #9a6a22; stroke: #d19a4a; }
  }
</style>
"##,
    );

    svg.push_str(&format!(
        r#"<text x="{}" y="{}" class="label" text-anchor="middle">{}</text>"#,
        center_x,
        MARGIN_TOP + 14.0,
        escape_xml(&format!("{}  ({:?})", resolution.layout, resolution.source))
    ));
    svg.push('\n');

    let to_svg = |r: &Rect| {
        (
            px + r.x as f64 * scale,
            py + r.y as f64 * scale,
            r.width as f64 * scale,
            r.height as f64 * scale,
        )
    };
    let mut rect = |r: &Rect, class: &str| {
        let (x, y, w, h) = to_svg(r);
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" class="{class}"/>"#
        ));
        svg.push('\n');
    };

    rect(&Rect::from_size(canvas.size()), "outer");
    rect(&canvas.safe_area(), "safe");
    for a in &resolution.assignments {
        let class = match a.item.role.group() {
            RoleGroup::Hero => "hero",
            RoleGroup::Support => "support",
            RoleGroup::Accessory => "accessory",
        };
        rect(&a.slot, "slot");
        rect(&a.fitted(), class);
    }

    for a in &resolution.assignments {
        let (x, y, w, h) = to_svg(&a.fitted());
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" class="item-label" text-anchor="middle">{}</text>"#,
            x + w / 2.0,
            y + h / 2.0,
            escape_xml(&format!("{} · {} · z{}", a.item.key, a.item.role, a.z))
        ));
        svg.push('\n');
    }

    svg.push_str(&format!(
        r#"<text x="{}" y="{:.1}" class="annotation" text-anchor="middle">{}</text>"#,
        center_x,
        py + ph + 18.0,
        escape_xml(&format!(
            "{}×{} @ {} DPI, {} item(s)",
            canvas.width,
            canvas.height,
            canvas.dpi,
            resolution.assignments.len()
        ))
    ));
    svg.push('\n');

    svg.push_str("</svg>\n");
    svg
}

/// Scale dimensions to fit within the panel bounds, preserving aspect.
fn scale_to_fit(width: u32, height: u32) -> (f64, f64, f64) {
    let w = width as f64;
    let h = height as f64;
    if w == 0.0 || h == 0.0 {
        return (1.0, 1.0, 1.0);
    }
    let scale = (MAX_PANEL_W / w).min(MAX_PANEL_H / h);
    (w * scale, h * scale, scale)
}

/// Escape special characters for XML text content.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
