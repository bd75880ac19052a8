//! Geometry primitives for slot placement.
//!
//! Pixel rectangles, canvas-relative fractional rectangles, aspect-preserving
//! fit, and overlap tests. Pure functions, no pixel data.
//!
//! # Example
//!
//! ```
//! use zenboard::geometry::{fit, Rect, Size};
//!
//! // A 1:2 portrait product into a square slot: height constrains, centered.
//! let placed = fit(Size::new(1000, 2000), Rect::new(0, 0, 400, 400));
//! assert_eq!(placed, Rect::new(100, 0, 200, 400));
//! ```

use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Slack allowed when checking that a fractional rect ends inside the canvas.
const FRACTION_EPSILON: f64 = 1e-6;

/// Width × height dimensions in pixels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. Zero height yields `0.0`.
    pub fn aspect(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Create a new rect.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rect covering a whole canvas of `size`.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether `other` lies fully inside this rect.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping region, or `None` when the rects do not share any area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Shrink by `insets` on each side. Saturates to an empty rect.
    pub fn inset(&self, insets: &Insets) -> Rect {
        let width = self.width.saturating_sub(insets.left + insets.right);
        let height = self.height.saturating_sub(insets.top + insets.bottom);
        Rect::new(self.x + insets.left, self.y + insets.top, width, height)
    }

    /// Express this rect as fractions of `canvas`.
    pub fn to_fraction(&self, canvas: Size) -> FracRect {
        let cw = canvas.width.max(1) as f64;
        let ch = canvas.height.max(1) as f64;
        FracRect {
            x: self.x as f64 / cw,
            y: self.y as f64 / ch,
            w: self.width as f64 / cw,
            h: self.height as f64 / ch,
        }
    }
}

/// Rectangle expressed as fractions of the canvas. All values in `0.0..=1.0`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FracRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FracRect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// Check every component and the far edges lie in `0.0..=1.0`, and that
    /// the rect has some width and height.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [("x", self.x), ("y", self.y), ("w", self.w), ("h", self.h)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::FractionOutOfRange { field, value });
            }
        }
        if self.w <= 0.0 || self.h <= 0.0 {
            return Err(ValidationError::EmptyFraction { w: self.w, h: self.h });
        }
        if self.x + self.w > 1.0 + FRACTION_EPSILON {
            return Err(ValidationError::FractionOutOfRange {
                field: "x + w",
                value: self.x + self.w,
            });
        }
        if self.y + self.h > 1.0 + FRACTION_EPSILON {
            return Err(ValidationError::FractionOutOfRange {
                field: "y + h",
                value: self.y + self.h,
            });
        }
        Ok(())
    }

    /// Reflect across the vertical center line of the canvas.
    pub fn mirrored(&self) -> FracRect {
        FracRect {
            x: (1.0 - self.x - self.w).max(0.0),
            ..*self
        }
    }
}

/// Margins in pixels (CSS order in constructors: top, right, bottom, left).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Insets {
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub bottom: u32,
    #[serde(default)]
    pub left: u32,
}

impl Insets {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same margin on every side.
    pub const fn uniform(margin: u32) -> Self {
        Self::new(margin, margin, margin, margin)
    }
}

/// Where to position a fitted image inside its slot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gravity {
    /// Center on both axes.
    #[default]
    Center,
    /// Position by percentage. `(0.0, 0.0)` = top-left, `(1.0, 1.0)` = bottom-right.
    Percentage(f32, f32),
}

/// Convert a fractional rect to pixels on a canvas of `canvas` size.
///
/// Edges are rounded independently so slots that share an edge in fraction
/// space also share it in pixel space.
pub fn to_pixels(frac: &FracRect, canvas: Size) -> Result<Rect, ValidationError> {
    frac.validate()?;
    let x0 = edge(frac.x, canvas.width);
    let y0 = edge(frac.y, canvas.height);
    let x1 = edge(frac.x + frac.w, canvas.width).max(x0);
    let y1 = edge(frac.y + frac.h, canvas.height).max(y0);
    Ok(Rect::new(x0, y0, x1 - x0, y1 - y0))
}

fn edge(frac: f64, extent: u32) -> u32 {
    let px = (frac * extent as f64).round();
    (px.max(0.0) as u32).min(extent)
}

/// Whether two rects overlap by more than `tolerance` pixels on both axes.
pub fn overlaps(a: &Rect, b: &Rect, tolerance: u32) -> bool {
    match a.intersection(b) {
        Some(i) => i.width > tolerance && i.height > tolerance,
        None => false,
    }
}

/// Largest rect with the aspect ratio of `source` that fits inside `target`, centered.
pub fn fit(source: Size, target: Rect) -> Rect {
    fit_with_gravity(source, target, &Gravity::Center)
}

/// Like [`fit`], positioning the result inside `target` by `gravity`.
///
/// The result is always contained in `target` and touches at least one pair
/// of its edges.
pub fn fit_with_gravity(source: Size, target: Rect, gravity: &Gravity) -> Rect {
    if target.width == 0 || target.height == 0 {
        return Rect::new(target.x, target.y, 0, 0);
    }
    if source.is_empty() {
        return target;
    }
    let (w, h) = fit_inside(source.width, source.height, target.width, target.height);
    let (w, h) = (w.min(target.width), h.min(target.height));
    let (ox, oy) = gravity_offset(target.width, target.height, w, h, gravity);
    Rect::new(target.x + ox, target.y + oy, w, h)
}

/// Approximate equality for floating-point geometry.
pub(crate) fn approx_eq<F: Float>(a: F, b: F, epsilon: F) -> bool {
    (a - b).abs() <= epsilon
}

// ============================================================================
// Internal geometry
// ============================================================================

/// Compute dimensions that fit inside the target box, preserving aspect ratio.
/// One dimension matches the target; the other is ≤ target.
fn fit_inside(sw: u32, sh: u32, tw: u32, th: u32) -> (u32, u32) {
    let ratio_w = tw as f64 / sw as f64;
    let ratio_h = th as f64 / sh as f64;
    if ratio_w <= ratio_h {
        let h = proportional(sw, sh, tw, true, tw, th);
        (tw, h)
    } else {
        let w = proportional(sw, sh, th, false, tw, th);
        (w, th)
    }
}

/// Placement offset for an image inside a box.
pub(crate) fn gravity_offset(cw: u32, ch: u32, iw: u32, ih: u32, gravity: &Gravity) -> (u32, u32) {
    let x = gravity_offset_1d(cw.saturating_sub(iw), gravity, true);
    let y = gravity_offset_1d(ch.saturating_sub(ih), gravity, false);
    (x, y)
}

fn gravity_offset_1d(space: u32, gravity: &Gravity, horizontal: bool) -> u32 {
    if space == 0 {
        return 0;
    }
    match gravity {
        Gravity::Center => space / 2,
        Gravity::Percentage(x, y) => {
            let pct = if horizontal { *x } else { *y };
            (space as f64 * pct.clamp(0.0, 1.0) as f64).round() as u32
        }
    }
}

/// Compute the free dimension proportionally, with snap-aware rounding.
///
/// Snaps to the source or target dimension when the proportional value is
/// within rounding loss of it, so 1200×400 into 100×33 yields width 100
/// rather than 99.
fn proportional(
    ratio_w: u32,
    ratio_h: u32,
    basis: u32,
    basis_is_width: bool,
    target_w: u32,
    target_h: u32,
) -> u32 {
    let ratio = ratio_w as f64 / ratio_h as f64;

    let snap_amount = if basis_is_width {
        rounding_loss_height(ratio_w, ratio_h, target_h)
    } else {
        rounding_loss_width(ratio_w, ratio_h, target_w)
    };

    let snap_a = if basis_is_width { ratio_h } else { ratio_w };
    let snap_b = if basis_is_width { target_h } else { target_w };

    let float = if basis_is_width {
        basis as f64 / ratio
    } else {
        ratio * basis as f64
    };

    let delta_a = (float - snap_a as f64).abs();
    let delta_b = (float - snap_b as f64).abs();

    let v = if delta_a <= snap_amount && delta_a <= delta_b {
        snap_a
    } else if delta_b <= snap_amount {
        snap_b
    } else {
        float.round() as u32
    };

    if v == 0 { 1 } else { v }
}

fn rounding_loss_width(ratio_w: u32, ratio_h: u32, target_width: u32) -> f64 {
    let ratio = ratio_w as f64 / ratio_h as f64;
    let recreate_y = ratio_h as f64 * (target_width as f64 / ratio_w as f64);
    let recreate_x_from_rounded_y = recreate_y.round() * ratio;
    (target_width as f64 - recreate_x_from_rounded_y).abs()
}

fn rounding_loss_height(ratio_w: u32, ratio_h: u32, target_height: u32) -> f64 {
    let ratio = ratio_w as f64 / ratio_h as f64;
    let recreate_x = ratio_w as f64 * (target_height as f64 / ratio_h as f64);
    let recreate_y_from_rounded_x = recreate_x.round() / ratio;
    (target_height as f64 - recreate_y_from_rounded_x).abs()
}
