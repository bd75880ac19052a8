//! Layout descriptions and their slots.
//!
//! A layout comes from one of three sources: a stored [`StaticLayout`], a
//! dynamic [`Archetype`] evaluated against the inventory, or a
//! [`LayoutNode`] tree proposed by an external planner. [`LayoutDescription::normalize`]
//! turns any of them into the same flat list of [`PlacedSlot`]s.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archetype::Archetype;
use crate::config::CanvasConfig;
use crate::error::Result;
use crate::geometry::{FracRect, Rect, to_pixels};
use crate::inventory::{Inventory, Role};
use crate::tree::LayoutNode;

/// Role a slot requires: one role, or any of several.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleRequirement {
    Role(Role),
    AnyOf(Vec<Role>),
}

impl RoleRequirement {
    pub fn roles(&self) -> &[Role] {
        match self {
            Self::Role(r) => core::slice::from_ref(r),
            Self::AnyOf(rs) => rs,
        }
    }

    /// Exact acceptance, ignoring compatibility classes.
    pub fn accepts(&self, role: Role) -> bool {
        self.roles().contains(&role)
    }

    /// The first listed role, used when naming an unmatched requirement.
    pub fn primary(&self) -> Option<Role> {
        self.roles().first().copied()
    }
}

impl From<Role> for RoleRequirement {
    fn from(role: Role) -> Self {
        Self::Role(role)
    }
}

/// A named placeholder in a layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    #[serde(default)]
    pub name: String,
    pub role: RoleRequirement,
    #[serde(flatten)]
    pub rect: FracRect,
    /// Explicit layering. Slots with different priorities may overlap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_priority: Option<i32>,
    /// Rotation hint in degrees, clockwise.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub rotation: f32,
    /// Optional slots may stay empty.
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
}

fn is_zero(v: &f32) -> bool {
    *v == 0.0
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Slot {
    pub fn new(name: impl Into<String>, role: impl Into<RoleRequirement>, rect: FracRect) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            rect,
            z_priority: None,
            rotation: 0.0,
            optional: false,
        }
    }

    pub fn z_priority(mut self, z: i32) -> Self {
        self.z_priority = Some(z);
        self
    }

    pub fn rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Inclusive item count range a layout accepts for one role.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountRange {
    #[serde(default)]
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub fn contains(&self, n: usize) -> bool {
        (self.min..=self.max).contains(&n)
    }
}

/// Per-role count ranges a static layout can accommodate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(pub BTreeMap<Role, CountRange>);

impl Signature {
    /// Derive from slots: required single-role slots raise `min` and `max`,
    /// optional or multi-role slots raise `max` only.
    pub fn from_slots(slots: &[Slot]) -> Self {
        let mut map: BTreeMap<Role, CountRange> = BTreeMap::new();
        for slot in slots {
            let roles = slot.role.roles();
            for role in roles {
                let range = map.entry(*role).or_default();
                range.max += 1;
                if roles.len() == 1 && !slot.optional {
                    range.min += 1;
                }
            }
        }
        Signature(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn range(&self, role: Role) -> CountRange {
        self.0.get(&role).copied().unwrap_or_default()
    }

    /// Every role's count falls inside its range (absent roles allow zero).
    pub fn accepts(&self, counts: &BTreeMap<Role, usize>) -> bool {
        Role::ALL
            .iter()
            .all(|r| self.range(*r).contains(counts.get(r).copied().unwrap_or(0)))
    }
}

/// A pre-authored layout: ordered slots plus a compatibility signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticLayout {
    #[serde(default)]
    pub name: String,
    pub slots: Vec<Slot>,
    #[serde(default, skip_serializing_if = "Signature::is_empty")]
    pub signature: Signature,
}

impl StaticLayout {
    /// Create a layout whose signature is derived from its slots.
    pub fn new(name: impl Into<String>, slots: Vec<Slot>) -> Self {
        let signature = Signature::from_slots(&slots);
        Self {
            name: name.into(),
            slots,
            signature,
        }
    }

    /// Declared signature, or one derived from the slots when none was given.
    pub fn effective_signature(&self) -> Signature {
        if self.signature.is_empty() {
            Signature::from_slots(&self.slots)
        } else {
            self.signature.clone()
        }
    }

    /// Horizontally mirrored variant.
    pub fn mirrored(&self) -> StaticLayout {
        StaticLayout {
            name: format!("Mirror_{}", self.name),
            slots: self
                .slots
                .iter()
                .map(|s| Slot {
                    rect: s.rect.mirrored(),
                    rotation: -s.rotation,
                    ..s.clone()
                })
                .collect(),
            signature: self.signature.clone(),
        }
    }

    /// Convert every slot to pixels on `canvas`.
    pub fn place(&self, canvas: &CanvasConfig) -> Result<Vec<PlacedSlot>> {
        self.slots
            .iter()
            .map(|slot| {
                let rect = to_pixels(&slot.rect, canvas.size())?;
                Ok(PlacedSlot {
                    slot: slot.clone(),
                    rect,
                })
            })
            .collect()
    }
}

/// Where a layout came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSource {
    Static,
    Dynamic,
    Proposed,
}

/// Any layout the resolver can work with.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutDescription {
    Static(StaticLayout),
    Dynamic(Archetype),
    Proposed(LayoutNode),
}

impl LayoutDescription {
    pub fn name(&self) -> String {
        match self {
            Self::Static(l) => l.name.clone(),
            Self::Dynamic(a) => a.layout_name(),
            Self::Proposed(_) => String::from("proposed"),
        }
    }

    pub fn source(&self) -> LayoutSource {
        match self {
            Self::Static(_) => LayoutSource::Static,
            Self::Dynamic(_) => LayoutSource::Dynamic,
            Self::Proposed(_) => LayoutSource::Proposed,
        }
    }

    /// Flatten into slots with absolute pixel rects, in declaration order.
    pub fn normalize(&self, inventory: &Inventory, canvas: &CanvasConfig) -> Result<Vec<PlacedSlot>> {
        match self {
            Self::Static(layout) => layout.place(canvas),
            Self::Dynamic(archetype) => archetype.generate(inventory, canvas)?.place(canvas),
            Self::Proposed(tree) => Ok(tree.flatten(canvas)?),
        }
    }
}

/// A slot with its resolved pixel rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedSlot {
    pub slot: Slot,
    pub rect: Rect,
}
