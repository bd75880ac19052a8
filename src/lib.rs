//! Storyboard layout resolution and compositing for role-tagged product images.
//!
//! An inventory of items (each tagged hero, large, small, …) is matched against
//! stored templates, procedurally generated archetypes or a layout tree from an
//! external planner. The result is a list of pixel slots with paint order, which
//! the compositor turns into a single raster.
//!
//! # Modules
//!
//! - [`geometry`]: rects, canvas fractions, aspect-preserving fit, overlap
//! - [`inventory`]: roles, items, the role-keyed inventory
//! - [`config`]: canvas, rendering and role compatibility configuration
//! - [`layout`]: slots, stored layouts and the three layout sources
//! - [`library`]: template directory scan, compatibility pre-filter, save
//! - [`archetype`]: dynamic layouts computed from inventory counts
//! - [`tree`]: proposed split/grid trees
//! - [`resolve`]: candidate selection, slot matching, z-order
//! - `compose` (feature `render`): raster compositing and PNG output
//! - `text` (feature `render`): item captions and the customer name
//! - `svg` (feature `svg`): SVG preview of a resolution
//!
//! # Example
//!
//! ```
//! use zenboard::{EngineConfig, Inventory, Item, MatchMode, Request, Resolver, Role, TemplateLibrary};
//!
//! let config = EngineConfig::default();
//! let library = TemplateLibrary::default();
//! let inventory = Inventory::new()
//!     .with(Item::new("towel", Role::Hero, 1000, 2000).unwrap())
//!     .with_many(Role::Small, 3, 500, 500).unwrap();
//!
//! let resolution = Resolver::new(&config, &library)
//!     .select_seeded(&inventory, &Request::Auto, MatchMode::Strict, 42)
//!     .unwrap();
//! assert_eq!(resolution.assignments.len(), 4);
//! ```

#![forbid(unsafe_code)]

pub mod archetype;
pub mod config;
pub mod error;
pub mod geometry;
pub mod inventory;
pub mod layout;
pub mod library;
pub mod resolve;
pub mod tree;

#[cfg(feature = "render")]
pub mod compose;
#[cfg(feature = "render")]
pub mod text;

#[cfg(feature = "svg")]
pub mod svg;

pub use archetype::Archetype;
pub use config::{
    CanvasConfig, CanvasText, CompatibilityTable, EngineConfig, LabelStyle, RenderConfig, ShadowConfig, StaticAsset,
};
pub use error::{Error, Result};
pub use geometry::{FracRect, Insets, Rect, Size, fit, overlaps, to_pixels};
pub use inventory::{Inventory, Item, Role};
pub use layout::{LayoutDescription, LayoutSource, Slot, StaticLayout};
pub use library::TemplateLibrary;
pub use resolve::{MatchMode, Request, Resolution, ResolvedAssignment, Resolver};
pub use tree::{Axis, LayoutNode};

#[cfg(feature = "render")]
pub use compose::{DirectoryLoader, ImageLoader, MemoryLoader, Storyboard, render};
#[cfg(feature = "render")]
pub use text::Typeface;
