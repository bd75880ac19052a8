//! Proposed layout trees.
//!
//! An external planner describes a layout as nested splits and grids with
//! relative proportions. [`LayoutNode::flatten`] resolves the tree against the
//! canvas safe area into the same flat slot list a stored layout produces.
//!
//! ```
//! use zenboard::config::CanvasConfig;
//! use zenboard::geometry::Rect;
//! use zenboard::inventory::Role;
//! use zenboard::tree::{Axis, LayoutNode};
//!
//! let tree = LayoutNode::split(Axis::Horizontal, [
//!     (0.6, LayoutNode::leaf(Role::Hero)),
//!     (0.4, LayoutNode::split(Axis::Vertical, [
//!         (0.5, LayoutNode::leaf(Role::Small)),
//!         (0.5, LayoutNode::leaf(Role::Small)),
//!     ])),
//! ]);
//! let slots = tree.flatten(&CanvasConfig::new(1000, 1000, 300)).unwrap();
//! assert_eq!(slots[0].rect, Rect::new(0, 0, 600, 1000));
//! assert_eq!(slots[2].rect, Rect::new(600, 500, 400, 500));
//! ```

use serde::{Deserialize, Serialize};

use crate::config::CanvasConfig;
use crate::error::LayoutTreeError;
use crate::geometry::{Rect, Size, approx_eq};
use crate::layout::{PlacedSlot, RoleRequirement, Slot};

/// Allowed deviation of a split's proportion sum from 1.
pub const PROPORTION_EPSILON: f64 = 1e-3;

/// Direction a split divides its rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Children side by side; divides the width.
    Horizontal,
    /// Children stacked; divides the height.
    Vertical,
}

/// One weighted child of a split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitChild {
    pub proportion: f64,
    pub node: LayoutNode,
}

/// A node of a proposed layout tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayoutNode {
    Split {
        axis: Axis,
        children: Vec<SplitChild>,
        /// Pixels between neighbouring children.
        #[serde(default)]
        gap: u32,
    },
    /// Even rows × cols subdivision. Children fill cells row-major; missing
    /// cells stay empty.
    Grid {
        rows: u32,
        cols: u32,
        #[serde(default)]
        children: Vec<LayoutNode>,
        #[serde(default)]
        gap: u32,
    },
    Leaf {
        role: RoleRequirement,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        z_priority: Option<i32>,
        #[serde(default)]
        rotation: f32,
    },
    /// Reserved space.
    Empty,
}

impl LayoutNode {
    pub fn leaf(role: impl Into<RoleRequirement>) -> Self {
        LayoutNode::Leaf {
            role: role.into(),
            z_priority: None,
            rotation: 0.0,
        }
    }

    pub fn split(axis: Axis, children: impl IntoIterator<Item = (f64, LayoutNode)>) -> Self {
        LayoutNode::Split {
            axis,
            children: children
                .into_iter()
                .map(|(proportion, node)| SplitChild { proportion, node })
                .collect(),
            gap: 0,
        }
    }

    pub fn grid(rows: u32, cols: u32, children: impl IntoIterator<Item = LayoutNode>) -> Self {
        LayoutNode::Grid {
            rows,
            cols,
            children: children.into_iter().collect(),
            gap: 0,
        }
    }

    /// Set the gap of a split or grid. No effect on other nodes.
    pub fn with_gap(mut self, px: u32) -> Self {
        if let LayoutNode::Split { gap, .. } | LayoutNode::Grid { gap, .. } = &mut self {
            *gap = px;
        }
        self
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            LayoutNode::Split { children, .. } => children.iter().map(|c| c.node.leaf_count()).sum(),
            LayoutNode::Grid { children, .. } => children.iter().map(LayoutNode::leaf_count).sum(),
            LayoutNode::Leaf { .. } => 1,
            LayoutNode::Empty => 0,
        }
    }

    /// Resolve into slots inside the canvas safe area, leaves in depth-first
    /// order. Slot names are the child index path from the root.
    pub fn flatten(&self, canvas: &CanvasConfig) -> Result<Vec<PlacedSlot>, LayoutTreeError> {
        let area = canvas.safe_area();
        let mut out = Vec::new();
        let mut flattener = Flattener {
            canvas: canvas.size(),
            out: &mut out,
        };
        flattener.visit(self, area, String::from("root"))?;
        Ok(out)
    }
}

struct Flattener<'a> {
    canvas: Size,
    out: &'a mut Vec<PlacedSlot>,
}

impl Flattener<'_> {
    fn visit(&mut self, node: &LayoutNode, area: Rect, path: String) -> Result<(), LayoutTreeError> {
        match node {
            LayoutNode::Empty => Ok(()),
            LayoutNode::Leaf {
                role,
                z_priority,
                rotation,
            } => {
                if area.width == 0 || area.height == 0 {
                    return Err(no_room(path, area));
                }
                let slot = Slot {
                    name: path,
                    role: role.clone(),
                    rect: area.to_fraction(self.canvas),
                    z_priority: *z_priority,
                    rotation: *rotation,
                    optional: false,
                };
                self.out.push(PlacedSlot { slot, rect: area });
                Ok(())
            }
            LayoutNode::Split { axis, children, gap } => {
                if children.is_empty() {
                    return Err(LayoutTreeError::EmptySplit { path });
                }
                if let Some(c) = children.iter().find(|c| c.proportion < 0.0 || c.proportion.is_nan()) {
                    return Err(LayoutTreeError::NegativeProportion {
                        path,
                        value: c.proportion,
                    });
                }
                let sum: f64 = children.iter().map(|c| c.proportion).sum();
                if !approx_eq(sum, 1.0, PROPORTION_EPSILON) {
                    return Err(LayoutTreeError::ProportionSum { path, sum });
                }
                let weights: Vec<f64> = children.iter().map(|c| c.proportion).collect();
                let (origin, extent) = match axis {
                    Axis::Horizontal => (area.x, area.width),
                    Axis::Vertical => (area.y, area.height),
                };
                let spans = divide(origin, extent, &weights, *gap).ok_or_else(|| no_room(path.clone(), area))?;
                for (i, (child, (start, len))) in children.iter().zip(spans).enumerate() {
                    let rect = match axis {
                        Axis::Horizontal => Rect::new(start, area.y, len, area.height),
                        Axis::Vertical => Rect::new(area.x, start, area.width, len),
                    };
                    self.visit(&child.node, rect, format!("{path}/{i}"))?;
                }
                Ok(())
            }
            LayoutNode::Grid {
                rows,
                cols,
                children,
                gap,
            } => {
                if *rows == 0 || *cols == 0 {
                    return Err(LayoutTreeError::EmptyGrid {
                        path,
                        rows: *rows,
                        cols: *cols,
                    });
                }
                let cells = *rows as usize * *cols as usize;
                if children.len() > cells {
                    return Err(LayoutTreeError::GridOverflow {
                        path,
                        rows: *rows,
                        cols: *cols,
                        children: children.len(),
                    });
                }
                let xs = divide(area.x, area.width, &vec![1.0; *cols as usize], *gap);
                let ys = divide(area.y, area.height, &vec![1.0; *rows as usize], *gap);
                let (Some(xs), Some(ys)) = (xs, ys) else {
                    return Err(no_room(path, area));
                };
                for (i, child) in children.iter().enumerate() {
                    let (x, w) = xs[i % xs.len()];
                    let (y, h) = ys[i / xs.len()];
                    self.visit(child, Rect::new(x, y, w, h), format!("{path}/{i}"))?;
                }
                Ok(())
            }
        }
    }
}

fn no_room(path: String, area: Rect) -> LayoutTreeError {
    LayoutTreeError::NoRoom {
        path,
        width: area.width,
        height: area.height,
    }
}

/// Divide `extent` pixels starting at `origin` by `weights`, leaving `gap`
/// pixels between parts. Part edges are rounded from cumulative weights so the
/// parts tile the available space exactly. `None` when the gaps leave no room.
fn divide(origin: u32, extent: u32, weights: &[f64], gap: u32) -> Option<Vec<(u32, u32)>> {
    let gaps = gap.checked_mul(weights.len().saturating_sub(1) as u32)?;
    let available = extent.checked_sub(gaps)?;
    if available == 0 {
        return None;
    }
    let total: f64 = weights.iter().sum();
    let edge = |cum: f64| -> u32 {
        if total <= 0.0 {
            return 0;
        }
        ((cum / total * available as f64).round() as u32).min(available)
    };

    let mut parts = Vec::with_capacity(weights.len());
    let mut cum = 0.0;
    let mut start = 0;
    for (i, w) in weights.iter().enumerate() {
        cum += w;
        let end = edge(cum);
        parts.push((origin + start + i as u32 * gap, end - start));
        start = end;
    }
    Some(parts)
}
