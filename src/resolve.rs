//! Layout resolution: candidate selection, slot matching, z-order.
//!
//! [`Resolver::resolve`] binds one layout description to an inventory.
//! [`Resolver::select`] gathers every compatible stored layout and active
//! archetype, shuffles them with the supplied random source and resolves the
//! first candidate that accepts the inventory. Pick order is uniform random;
//! a seeded generator makes it reproducible.
//!
//! Matching visits required slots before optional ones, each group in
//! descending area order with declaration order breaking ties. A slot takes
//! the next unused item of its exact role, or in [`MatchMode::Flexible`] of a
//! substitute role from the [`CompatibilityTable`]. When nothing admissible is
//! free, earlier slots are moved to other admissible items along an augmenting
//! path, so a greedy substitute never blocks an assignment that exists. A
//! required slot left empty or an item left unplaced rejects the candidate.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::archetype;
use crate::config::{CompatibilityTable, EngineConfig, RenderConfig};
use crate::error::{Error, Result, UnresolvableInventoryError, ValidationError};
use crate::geometry::{Rect, fit, overlaps};
use crate::inventory::{Inventory, Item, Role};
use crate::layout::{LayoutDescription, LayoutSource, PlacedSlot, RoleRequirement};
use crate::library::TemplateLibrary;
use crate::tree::LayoutNode;

/// Slots smaller than this on either side are logged as undersized.
const MIN_SLOT_SIDE: u32 = 400;
/// Hero slots narrower than this share of the canvas width are logged.
const MIN_HERO_WIDTH_SHARE: f64 = 0.30;

/// Slot–item matching policy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// A slot takes only items of a role it lists.
    #[default]
    Strict,
    /// A slot may also take items of a configured substitute role.
    Flexible,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchMode::Strict => "strict",
            MatchMode::Flexible => "flexible",
        })
    }
}

/// Whether a slot requiring `req` may take an item of `role` under `mode`.
pub(crate) fn admits(req: &RoleRequirement, role: Role, mode: MatchMode, table: &CompatibilityTable) -> bool {
    req.accepts(role)
        || (mode == MatchMode::Flexible && req.roles().iter().any(|r| table.substitutes(*r).contains(&role)))
}

/// Which layouts [`Resolver::select`] may use.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Request {
    /// Any compatible stored layout or active archetype.
    #[default]
    Auto,
    /// A stored layout or archetype by name. Falls back to [`Auto`](Self::Auto)
    /// with a warning if it is unknown or rejects the inventory.
    Named(String),
    /// A tree from an external planner. With `fallback`, a tree that fails to
    /// resolve falls back to [`Auto`](Self::Auto) instead of failing the run.
    Proposed { tree: LayoutNode, fallback: bool },
}

/// One item bound to one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedAssignment {
    pub slot_name: String,
    pub item: Item,
    /// Destination slot on the canvas, in pixels.
    pub slot: Rect,
    /// Position in the total paint order, 0 painted first.
    pub z: u32,
    pub z_priority: i32,
    /// Rotation hint from the slot, in degrees.
    pub rotation: f32,
}

impl ResolvedAssignment {
    /// Where the item lands: its aspect-preserving fit inside the slot.
    pub fn fitted(&self) -> Rect {
        fit(self.item.size, self.slot)
    }

    /// Rotation the compositor applies. Zero unless rotation is enabled.
    pub fn effective_rotation(&self, render: &RenderConfig) -> f32 {
        if render.rotation_enabled { self.rotation } else { 0.0 }
    }
}

/// A fully resolved layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub layout: String,
    pub source: LayoutSource,
    /// Sorted by ascending `z`.
    pub assignments: Vec<ResolvedAssignment>,
}

impl Resolution {
    pub fn get(&self, item_key: &str) -> Option<&ResolvedAssignment> {
        self.assignments.iter().find(|a| a.item.key == item_key)
    }
}

/// Why a single candidate was rejected.
#[derive(Debug)]
enum Rejected {
    /// A required slot found no item.
    Unmatched(Role),
    /// An item found no slot.
    Leftover(Role),
    Invalid(Error),
}

impl Rejected {
    fn role(&self) -> Option<Role> {
        match self {
            Rejected::Unmatched(r) | Rejected::Leftover(r) => Some(*r),
            Rejected::Invalid(_) => None,
        }
    }
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejected::Unmatched(r) => write!(f, "no item for required '{r}' slot"),
            Rejected::Leftover(r) => write!(f, "no slot left for '{r}' item"),
            Rejected::Invalid(e) => write!(f, "{e}"),
        }
    }
}

impl From<Error> for Rejected {
    fn from(e: Error) -> Self {
        Rejected::Invalid(e)
    }
}

impl From<ValidationError> for Rejected {
    fn from(e: ValidationError) -> Self {
        Rejected::Invalid(e.into())
    }
}

/// Resolves layouts against one engine configuration and template library.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a EngineConfig,
    library: &'a TemplateLibrary,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a EngineConfig, library: &'a TemplateLibrary) -> Self {
        Self { config, library }
    }

    /// Bind `layout` to `inventory`.
    ///
    /// Fails with [`Error::Unresolvable`] when a required slot or an item is
    /// left unmatched, and with the underlying error when the layout itself is
    /// malformed.
    pub fn resolve(&self, layout: &LayoutDescription, inventory: &Inventory, mode: MatchMode) -> Result<Resolution> {
        self.try_candidate(layout, inventory, mode).map_err(|rejected| match rejected {
            Rejected::Unmatched(role) | Rejected::Leftover(role) => UnresolvableInventoryError {
                role,
                mode,
                counts: inventory.describe_counts(),
                tried: 1,
                layouts: layout.name(),
            }
            .into(),
            Rejected::Invalid(e) => e,
        })
    }

    /// Stored layouts passing the count pre-filter, then active archetypes.
    pub fn candidates(&self, inventory: &Inventory, mode: MatchMode) -> Vec<LayoutDescription> {
        let stored = self
            .library
            .list_compatible(inventory, mode, &self.config.compatibility)
            .into_iter()
            .cloned()
            .map(LayoutDescription::Static);
        let dynamic = archetype::active(inventory).into_iter().map(LayoutDescription::Dynamic);
        stored.chain(dynamic).collect()
    }

    /// Pick and resolve a layout for `inventory`.
    pub fn select<R: Rng + ?Sized>(
        &self,
        inventory: &Inventory,
        request: &Request,
        mode: MatchMode,
        rng: &mut R,
    ) -> Result<Resolution> {
        self.config.canvas.validate()?;
        if inventory.is_empty() {
            return Err(Error::EmptyInventory);
        }
        match request {
            Request::Auto => {}
            Request::Named(name) => match self.named(name) {
                Some(layout) => match self.resolve(&layout, inventory, mode) {
                    Ok(resolution) => return Ok(self.accept(resolution)),
                    Err(e) => tracing::warn!("forced layout '{name}' rejected ({e}); using automatic selection"),
                },
                None => tracing::warn!("forced layout '{name}' not found; using automatic selection"),
            },
            Request::Proposed { tree, fallback } => {
                match self.resolve(&LayoutDescription::Proposed(tree.clone()), inventory, mode) {
                    Ok(resolution) => return Ok(self.accept(resolution)),
                    Err(e) if *fallback => {
                        tracing::warn!("proposed layout rejected ({e}); falling back to automatic selection")
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        self.select_auto(inventory, mode, rng)
    }

    /// [`select`](Self::select) with a `StdRng` seeded from `seed`.
    pub fn select_seeded(&self, inventory: &Inventory, request: &Request, mode: MatchMode, seed: u64) -> Result<Resolution> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.select(inventory, request, mode, &mut rng)
    }

    fn named(&self, name: &str) -> Option<LayoutDescription> {
        if let Some(layout) = self.library.get(name) {
            return Some(LayoutDescription::Static(layout.clone()));
        }
        archetype::Archetype::from_name(name).map(LayoutDescription::Dynamic)
    }

    fn select_auto<R: Rng + ?Sized>(&self, inventory: &Inventory, mode: MatchMode, rng: &mut R) -> Result<Resolution> {
        let mut pool = self.candidates(inventory, mode);
        tracing::debug!(
            "candidate pool for {}: [{}]",
            inventory.describe_counts(),
            pool.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );
        pool.shuffle(rng);

        let mut rejections: Vec<(String, Rejected)> = Vec::new();
        for candidate in &pool {
            match self.try_candidate(candidate, inventory, mode) {
                Ok(resolution) => return Ok(self.accept(resolution)),
                Err(rejected) => {
                    tracing::debug!("candidate '{}' rejected: {rejected}", candidate.name());
                    rejections.push((candidate.name(), rejected));
                }
            }
        }

        Err(UnresolvableInventoryError {
            role: self.blame(inventory, mode, &rejections),
            mode,
            counts: inventory.describe_counts(),
            tried: rejections.len(),
            layouts: if rejections.is_empty() {
                String::from("none")
            } else {
                rejections.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(", ")
            },
        }
        .into())
    }

    /// Role to name when the pool is exhausted: the most common match failure,
    /// or the first role no stored layout has room for.
    fn blame(&self, inventory: &Inventory, mode: MatchMode, rejections: &[(String, Rejected)]) -> Role {
        let mut tally: BTreeMap<Role, usize> = BTreeMap::new();
        for role in rejections.iter().filter_map(|(_, r)| r.role()) {
            *tally.entry(role).or_default() += 1;
        }
        if let Some((role, _)) = tally.iter().max_by_key(|(role, n)| (**n, Reverse(**role))) {
            return *role;
        }
        let table = &self.config.compatibility;
        let counts = inventory.counts();
        counts
            .iter()
            .find(|(role, n)| {
                self.library.layouts().iter().all(|l| {
                    l.slots.iter().filter(|s| admits(&s.role, **role, mode, table)).count() < **n
                })
            })
            .or_else(|| counts.iter().next())
            .map(|(role, _)| *role)
            .unwrap_or(Role::Hero)
    }

    fn accept(&self, resolution: Resolution) -> Resolution {
        tracing::info!(
            "selected {:?} layout '{}' with {} assignment(s)",
            resolution.source,
            resolution.layout,
            resolution.assignments.len()
        );
        self.warn_undersized(&resolution);
        resolution
    }

    fn warn_undersized(&self, resolution: &Resolution) {
        let hero_min = self.config.canvas.width as f64 * MIN_HERO_WIDTH_SHARE;
        for a in &resolution.assignments {
            if a.slot.width < MIN_SLOT_SIDE || a.slot.height < MIN_SLOT_SIDE {
                tracing::warn!(
                    "slot '{}' for '{}' is only {}×{}px",
                    a.slot_name,
                    a.item.key,
                    a.slot.width,
                    a.slot.height
                );
            }
            if a.item.role == Role::Hero && (a.slot.width as f64) < hero_min {
                tracing::warn!(
                    "hero slot '{}' is {}px wide, under {:.0}% of the canvas",
                    a.slot_name,
                    a.slot.width,
                    MIN_HERO_WIDTH_SHARE * 100.0
                );
            }
        }
    }

    fn try_candidate(
        &self,
        layout: &LayoutDescription,
        inventory: &Inventory,
        mode: MatchMode,
    ) -> core::result::Result<Resolution, Rejected> {
        let slots = layout.normalize(inventory, &self.config.canvas)?;
        let name = layout.name();
        let mut assignments = match_slots(&slots, inventory, mode, &self.config.compatibility)?;
        check_overlaps(&name, &assignments, self.config.overlap_tolerance_px)?;
        order_by_depth(&mut assignments);
        Ok(Resolution {
            layout: name,
            source: layout.source(),
            assignments: assignments.into_iter().map(|(_, a)| a).collect(),
        })
    }
}

/// Assign items to slots. Assignments come back in slot declaration order.
fn match_slots(
    slots: &[PlacedSlot],
    inventory: &Inventory,
    mode: MatchMode,
    table: &CompatibilityTable,
) -> core::result::Result<Vec<(usize, ResolvedAssignment)>, Rejected> {
    let items: Vec<&Item> = inventory.iter().collect();
    let mut order: Vec<usize> = (0..slots.len()).collect();
    order.sort_by_key(|&i| (slots[i].slot.optional, Reverse(slots[i].rect.area()), i));

    // Items each slot admits, best first: exact roles, then substitutes in
    // table order, inventory order within a role.
    let items_ref = &items;
    let options: Vec<Vec<usize>> = slots
        .iter()
        .map(|placed| {
            let req = &placed.slot.role;
            let mut roles: Vec<Role> = req.roles().to_vec();
            if mode == MatchMode::Flexible {
                for sub in req.roles().iter().flat_map(|r| table.substitutes(*r)) {
                    if !roles.contains(sub) {
                        roles.push(*sub);
                    }
                }
            }
            roles
                .iter()
                .flat_map(|&role| (0..items_ref.len()).filter(move |&j| items_ref[j].role == role))
                .collect()
        })
        .collect();

    let mut claims = Claims {
        options: &options,
        owner: vec![None; items.len()],
        held: vec![None; slots.len()],
    };
    for i in order {
        let mut seen = vec![false; items.len()];
        if !claims.claim(i, &mut seen) && !slots[i].slot.optional {
            return Err(Rejected::Unmatched(slots[i].slot.role.primary().unwrap_or(Role::Hero)));
        }
    }
    if let Some(j) = claims.owner.iter().position(Option::is_none) {
        return Err(Rejected::Leftover(items[j].role));
    }

    Ok(claims
        .held
        .iter()
        .enumerate()
        .filter_map(|(i, held)| held.map(|j| (i, j)))
        .map(|(i, j)| {
            let placed = &slots[i];
            (
                i,
                ResolvedAssignment {
                    slot_name: placed.slot.name.clone(),
                    item: items[j].clone(),
                    slot: placed.rect,
                    z: 0,
                    z_priority: placed.slot.z_priority.unwrap_or(0),
                    rotation: placed.slot.rotation,
                },
            )
        })
        .collect())
}

/// Slot/item bipartite matching state.
struct Claims<'a> {
    options: &'a [Vec<usize>],
    /// Slot holding each item.
    owner: Vec<Option<usize>>,
    /// Item held by each slot.
    held: Vec<Option<usize>>,
}

impl Claims<'_> {
    /// Give slot `i` an item. Takes the best free one; failing that, moves an
    /// earlier slot to another admissible item along an augmenting path.
    fn claim(&mut self, i: usize, seen: &mut [bool]) -> bool {
        let options = self.options;
        if let Some(&j) = options[i].iter().find(|&&j| self.owner[j].is_none()) {
            self.bind(i, j);
            return true;
        }
        for &j in &options[i] {
            if seen[j] {
                continue;
            }
            seen[j] = true;
            if let Some(other) = self.owner[j]
                && self.claim(other, seen)
            {
                self.bind(i, j);
                return true;
            }
        }
        false
    }

    fn bind(&mut self, slot: usize, item: usize) {
        self.owner[item] = Some(slot);
        self.held[slot] = Some(item);
    }
}

fn check_overlaps(
    layout: &str,
    assignments: &[(usize, ResolvedAssignment)],
    tolerance: u32,
) -> core::result::Result<(), ValidationError> {
    for (i, (_, a)) in assignments.iter().enumerate() {
        for (_, b) in &assignments[i + 1..] {
            if a.z_priority == b.z_priority && overlaps(&a.slot, &b.slot, tolerance) {
                return Err(ValidationError::Overlap {
                    layout: layout.to_string(),
                    first: a.slot_name.clone(),
                    second: b.slot_name.clone(),
                    tolerance,
                });
            }
        }
    }
    Ok(())
}

/// Total paint order: slot priority, then smaller roles on top, then
/// declaration order.
fn order_by_depth(assignments: &mut [(usize, ResolvedAssignment)]) {
    assignments.sort_by_key(|(i, a)| (a.z_priority, a.item.role.depth_rank(), *i));
    for (z, (_, a)) in assignments.iter_mut().enumerate() {
        a.z = z as u32;
    }
}
