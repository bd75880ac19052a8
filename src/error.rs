//! Error taxonomy.
//!
//! Each failure class has its own type so callers can tell a bad template
//! file (skipped) from a bad inventory (fatal). [`Error`] wraps all of them.

use std::path::PathBuf;

use thiserror::Error;

use crate::inventory::Role;
use crate::resolve::MatchMode;

/// Malformed geometric input. Fatal to the offending layout candidate only.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    /// A fractional coordinate is outside `0.0..=1.0` or the rect leaves the canvas.
    #[error("fractional {field} = {value} is outside 0..=1")]
    FractionOutOfRange { field: &'static str, value: f64 },

    /// A fractional rect with no width or no height.
    #[error("fractional rect {w}×{h} has no area")]
    EmptyFraction { w: f64, h: f64 },

    /// An item was created with a zero width or height.
    #[error("item '{key}' has zero dimension {width}×{height}")]
    ZeroDimension { key: String, width: u32, height: u32 },

    /// Canvas has zero width, height or DPI.
    #[error("canvas {width}×{height} @ {dpi} DPI is degenerate")]
    DegenerateCanvas { width: u32, height: u32, dpi: u32 },

    /// Two assignments on the same z-priority overlap more than the tolerance.
    #[error("layout '{layout}': slots '{first}' and '{second}' overlap beyond {tolerance}px")]
    Overlap {
        layout: String,
        first: String,
        second: String,
        tolerance: u32,
    },
}

/// A template file that could not be read or parsed. The file is skipped.
#[derive(Debug, Error)]
#[error("template '{}': {reason}", path.display())]
pub struct TemplateLoadError {
    pub path: PathBuf,
    pub reason: String,
}

/// A proposed layout tree that cannot be normalized into slots.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LayoutTreeError {
    #[error("split at {path} has proportions summing to {sum}, expected 1")]
    ProportionSum { path: String, sum: f64 },

    #[error("split at {path} has negative proportion {value}")]
    NegativeProportion { path: String, value: f64 },

    #[error("split at {path} has no children")]
    EmptySplit { path: String },

    #[error("grid at {path} has zero dimension {rows}×{cols}")]
    EmptyGrid { path: String, rows: u32, cols: u32 },

    #[error("grid at {path} has {children} children for {rows}×{cols} cells")]
    GridOverflow {
        path: String,
        rows: u32,
        cols: u32,
        children: usize,
    },

    #[error("node at {path} has no room: {width}×{height}px")]
    NoRoom { path: String, width: u32, height: u32 },
}

/// No candidate layout could place the inventory under the active mode.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "no layout accommodates the inventory in {mode} mode: unmatched role '{role}' \
     (inventory counts: {counts}; tried {tried} candidate(s): {layouts})"
)]
pub struct UnresolvableInventoryError {
    pub role: Role,
    pub mode: MatchMode,
    /// Human readable `role×count` list of the inventory.
    pub counts: String,
    pub tried: usize,
    pub layouts: String,
}

/// A required item image could not be loaded.
#[derive(Debug, Error)]
#[error("asset '{key}' could not be loaded: {reason}")]
pub struct AssetLoadError {
    pub key: String,
    pub reason: String,
}

/// Any error the engine can surface to a caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    TemplateLoad(#[from] TemplateLoadError),

    #[error(transparent)]
    LayoutTree(#[from] LayoutTreeError),

    #[error(transparent)]
    Unresolvable(#[from] UnresolvableInventoryError),

    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),

    #[error("inventory is empty; nothing to lay out")]
    EmptyInventory,

    #[error("unknown archetype '{0}'")]
    UnknownArchetype(String),

    #[error("archetype '{archetype}' has no rule for this inventory ({counts})")]
    ArchetypeInactive { archetype: String, counts: String },

    #[error("config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "render")]
    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "render")]
    #[error("png: {0}")]
    Png(#[from] png::EncodingError),
}

pub type Result<T> = core::result::Result<T, Error>;
