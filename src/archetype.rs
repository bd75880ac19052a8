//! Dynamic layout archetypes.
//!
//! Each archetype is a closed-form rule that turns inventory counts into one
//! slot per item inside the canvas safe area. An archetype with no rule for
//! the current counts is inactive and never offered as a candidate.
//!
//! Rules work in unit coordinates of the safe area and are mapped to canvas
//! fractions at the end, so every slot stays inside the margins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CanvasConfig;
use crate::error::{Error, Result};
use crate::geometry::FracRect;
use crate::inventory::{Inventory, Item, RoleGroup};
use crate::layout::{Slot, StaticLayout};

/// Gap between neighbouring slots, as a fraction of the safe-area extent.
const GAP: f64 = 0.02;
/// Share of the safe-area width given to the hero in the grid archetypes.
const HERO_COLUMN: f64 = 0.45;
/// Share of the safe-area height given to the hero in the band archetype.
const HERO_BAND: f64 = 0.60;
/// Side of the center cell in the orbit archetype.
const ORBIT_CENTER: f64 = 0.40;

const MAX_GRID_CELLS: usize = 8;
const MAX_BAND_ITEMS: usize = 6;
const MAX_STACK_ITEMS: usize = 4;
const MAX_QUADRANT_EXTRAS: usize = 6;
const MAX_ORBIT_ITEMS: usize = 8;
const MAX_MOSAIC_ITEMS: usize = 12;

/// A procedurally generated layout family.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// One hero in a left column, the rest in a two-column grid on the right.
    HeroLeftGrid,
    /// Mirror of [`HeroLeftGrid`](Self::HeroLeftGrid).
    HeroRightGrid,
    /// A landscape hero across the top, the rest in one row beneath.
    HeroTopBand,
    /// Two heroes in the outer columns, the rest stacked in the middle.
    ThreeColumn,
    /// Two or three large items in quadrants, extras clustered in the last.
    Quadrant,
    /// One hero in the center, the rest around it by angular position.
    HeroOrbit,
    /// No hero: an even three-column grid.
    Mosaic,
}

impl Archetype {
    pub const ALL: [Archetype; 7] = [
        Archetype::HeroLeftGrid,
        Archetype::HeroRightGrid,
        Archetype::HeroTopBand,
        Archetype::ThreeColumn,
        Archetype::Quadrant,
        Archetype::HeroOrbit,
        Archetype::Mosaic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Archetype::HeroLeftGrid => "hero_left_grid",
            Archetype::HeroRightGrid => "hero_right_grid",
            Archetype::HeroTopBand => "hero_top_band",
            Archetype::ThreeColumn => "three_column",
            Archetype::Quadrant => "quadrant",
            Archetype::HeroOrbit => "hero_orbit",
            Archetype::Mosaic => "mosaic",
        }
    }

    /// Name of the layouts this archetype generates.
    pub fn layout_name(&self) -> String {
        format!("Dynamic_{}", self.name())
    }

    /// Look up by [`name`](Self::name) or [`layout_name`](Self::layout_name).
    pub fn from_name(name: &str) -> Option<Archetype> {
        let bare = name.strip_prefix("Dynamic_").unwrap_or(name);
        Self::ALL.into_iter().find(|a| a.name() == bare)
    }

    /// Whether this archetype has a rule for the inventory's counts.
    pub fn is_active(&self, inventory: &Inventory) -> bool {
        self.cells(inventory).is_some()
    }

    /// Generate one slot per inventory item inside the canvas safe area.
    pub fn generate(&self, inventory: &Inventory, canvas: &CanvasConfig) -> Result<StaticLayout> {
        let cells = self.cells(inventory).ok_or_else(|| Error::ArchetypeInactive {
            archetype: self.name().to_string(),
            counts: inventory.describe_counts(),
        })?;
        let safe = canvas.safe_fraction();
        let slots = cells
            .into_iter()
            .enumerate()
            .map(|(i, (item, unit))| Slot::new(format!("{}{}", item.role, i + 1), item.role, unit.within(&safe)))
            .collect();
        Ok(StaticLayout::new(self.layout_name(), slots))
    }

    fn cells<'a>(&self, inventory: &'a Inventory) -> Option<Vec<(&'a Item, Unit)>> {
        let groups = Groups::of(inventory);
        if groups.total() == 0 {
            return None;
        }
        match self {
            Archetype::HeroLeftGrid => hero_grid(&groups),
            Archetype::HeroRightGrid => hero_grid(&groups).map(|cells| {
                cells
                    .into_iter()
                    .map(|(item, u)| (item, u.mirrored()))
                    .collect()
            }),
            Archetype::HeroTopBand => hero_top_band(&groups),
            Archetype::ThreeColumn => three_column(&groups),
            Archetype::Quadrant => quadrant(&groups),
            Archetype::HeroOrbit => hero_orbit(&groups),
            Archetype::Mosaic => mosaic(&groups),
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Archetypes with a rule for this inventory, in declaration order.
pub fn active(inventory: &Inventory) -> Vec<Archetype> {
    Archetype::ALL
        .into_iter()
        .filter(|a| a.is_active(inventory))
        .collect()
}

/// Generate a layout by archetype name.
pub fn generate(inventory: &Inventory, archetype_id: &str, canvas: &CanvasConfig) -> Result<StaticLayout> {
    let archetype =
        Archetype::from_name(archetype_id).ok_or_else(|| Error::UnknownArchetype(archetype_id.to_string()))?;
    archetype.generate(inventory, canvas)
}

// ============================================================================
// Rules
// ============================================================================

/// Rectangle in unit coordinates of the safe area.
#[derive(Copy, Clone, Debug, PartialEq)]
struct Unit {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl Unit {
    fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        let x = x.clamp(0.0, 1.0);
        let y = y.clamp(0.0, 1.0);
        Self {
            x,
            y,
            w: w.clamp(0.0, 1.0 - x),
            h: h.clamp(0.0, 1.0 - y),
        }
    }

    fn mirrored(self) -> Self {
        Self::new(1.0 - self.x - self.w, self.y, self.w, self.h)
    }

    fn within(&self, safe: &FracRect) -> FracRect {
        FracRect::new(
            safe.x + self.x * safe.w,
            safe.y + self.y * safe.h,
            self.w * safe.w,
            self.h * safe.h,
        )
    }
}

struct Groups<'a> {
    heroes: Vec<&'a Item>,
    supports: Vec<&'a Item>,
    accessories: Vec<&'a Item>,
}

impl<'a> Groups<'a> {
    fn of(inventory: &'a Inventory) -> Self {
        Self {
            heroes: inventory.group(RoleGroup::Hero),
            supports: inventory.group(RoleGroup::Support),
            accessories: inventory.group(RoleGroup::Accessory),
        }
    }

    fn total(&self) -> usize {
        self.heroes.len() + self.supports.len() + self.accessories.len()
    }

    /// Non-hero items, supports first.
    fn others(&self) -> Vec<&'a Item> {
        self.supports
            .iter()
            .chain(self.accessories.iter())
            .copied()
            .collect()
    }

    fn all(&self) -> Vec<&'a Item> {
        self.heroes.iter().copied().chain(self.others()).collect()
    }
}

/// `count` equal spans over `0..1` with [`GAP`] between them.
fn spans(count: usize) -> Vec<(f64, f64)> {
    let n = count.max(1) as f64;
    let len = (1.0 - GAP * (n - 1.0)) / n;
    (0..count).map(|i| (i as f64 * (len + GAP), len)).collect()
}

fn hero_grid<'a>(g: &Groups<'a>) -> Option<Vec<(&'a Item, Unit)>> {
    if g.heroes.len() != 1 {
        return None;
    }
    let cells_needed = g.supports.len() + g.accessories.len().div_ceil(2);
    if cells_needed > MAX_GRID_CELLS {
        return None;
    }

    let mut out = vec![(g.heroes[0], Unit::new(0.0, 0.0, HERO_COLUMN, 1.0))];
    if cells_needed == 0 {
        return Some(out);
    }

    let rx = HERO_COLUMN + GAP;
    let rw = 1.0 - rx;
    let cols = spans(2);
    let rows = spans(cells_needed.div_ceil(2));
    let cell = |i: usize| {
        let (cx, cw) = cols[i % 2];
        let (cy, ch) = rows[i / 2];
        Unit::new(rx + cx * rw, cy, cw * rw, ch)
    };

    let mut next = 0;
    for &item in &g.supports {
        out.push((item, cell(next)));
        next += 1;
    }
    for pair in g.accessories.chunks(2) {
        let c = cell(next);
        if let [top, bottom] = pair {
            let h = (c.h - GAP) / 2.0;
            out.push((*top, Unit::new(c.x, c.y, c.w, h)));
            out.push((*bottom, Unit::new(c.x, c.y + h + GAP, c.w, h)));
        } else {
            out.push((pair[0], c));
        }
        next += 1;
    }
    Some(out)
}

fn hero_top_band<'a>(g: &Groups<'a>) -> Option<Vec<(&'a Item, Unit)>> {
    if g.heroes.len() != 1 || g.heroes[0].aspect() < 1.0 {
        return None;
    }
    let others = g.others();
    if others.is_empty() || others.len() > MAX_BAND_ITEMS {
        return None;
    }
    let mut out = vec![(g.heroes[0], Unit::new(0.0, 0.0, 1.0, HERO_BAND))];
    let by = HERO_BAND + GAP;
    for (&item, (x, w)) in others.iter().zip(spans(others.len())) {
        out.push((item, Unit::new(x, by, w, 1.0 - by)));
    }
    Some(out)
}

fn three_column<'a>(g: &Groups<'a>) -> Option<Vec<(&'a Item, Unit)>> {
    if g.heroes.len() != 2 {
        return None;
    }
    let others = g.others();
    if others.len() > MAX_STACK_ITEMS {
        return None;
    }
    let cols = spans(3);
    let mut out = vec![
        (g.heroes[0], Unit::new(cols[0].0, 0.0, cols[0].1, 1.0)),
        (g.heroes[1], Unit::new(cols[2].0, 0.0, cols[2].1, 1.0)),
    ];
    for (&item, (y, h)) in others.iter().zip(spans(others.len())) {
        out.push((item, Unit::new(cols[1].0, y, cols[1].1, h)));
    }
    Some(out)
}

fn quadrant<'a>(g: &Groups<'a>) -> Option<Vec<(&'a Item, Unit)>> {
    let large = g.heroes.len() + g.supports.len();
    if !(2..=3).contains(&large) {
        return None;
    }
    let all = g.all();
    let extras = all.get(3..).unwrap_or(&[]);
    if extras.len() > MAX_QUADRANT_EXTRAS {
        return None;
    }

    let q = spans(2);
    let quad = |col: usize, row: usize| Unit::new(q[col].0, q[row].0, q[col].1, q[row].1);
    let mut out: Vec<(&Item, Unit)> = all
        .iter()
        .take(3)
        .zip([quad(0, 0), quad(1, 0), quad(0, 1)])
        .map(|(item, u)| (*item, u))
        .collect();

    let q4 = quad(1, 1);
    match extras {
        [] => {}
        [single] => out.push((*single, q4)),
        _ => {
            let cols = spans(2);
            let rows = spans(extras.len().div_ceil(2));
            for (i, &item) in extras.iter().enumerate() {
                let (cx, cw) = cols[i % 2];
                let (cy, ch) = rows[i / 2];
                out.push((
                    item,
                    Unit::new(q4.x + cx * q4.w, q4.y + cy * q4.h, cw * q4.w, ch * q4.h),
                ));
            }
        }
    }
    Some(out)
}

/// Ring cells around the center, clockwise from 12 o'clock, as (col, row).
const ORBIT_RING: [(usize, usize); 8] = [
    (1, 0),
    (2, 0),
    (2, 1),
    (2, 2),
    (1, 2),
    (0, 2),
    (0, 1),
    (0, 0),
];

fn hero_orbit<'a>(g: &Groups<'a>) -> Option<Vec<(&'a Item, Unit)>> {
    let others = g.others();
    if g.heroes.len() != 1 || others.is_empty() || others.len() > MAX_ORBIT_ITEMS {
        return None;
    }
    let side = (1.0 - ORBIT_CENTER - 2.0 * GAP) / 2.0;
    let bands = [
        (0.0, side),
        (side + GAP, ORBIT_CENTER),
        (side + GAP + ORBIT_CENTER + GAP, side),
    ];
    let cell = |(col, row): (usize, usize)| Unit::new(bands[col].0, bands[row].0, bands[col].1, bands[row].1);

    let mut out = vec![(g.heroes[0], cell((1, 1)))];
    let n = others.len();
    for (i, &item) in others.iter().enumerate() {
        out.push((item, cell(ORBIT_RING[i * ORBIT_RING.len() / n])));
    }
    Some(out)
}

fn mosaic<'a>(g: &Groups<'a>) -> Option<Vec<(&'a Item, Unit)>> {
    let items = g.others();
    if !g.heroes.is_empty() || items.len() > MAX_MOSAIC_ITEMS {
        return None;
    }
    let cols = spans(items.len().min(3));
    let rows = spans(items.len().div_ceil(3));
    let ncols = cols.len();
    Some(
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let (x, w) = cols[i % ncols];
                let (y, h) = rows[i / ncols];
                (*item, Unit::new(x, y, w, h))
            })
            .collect(),
    )
}
