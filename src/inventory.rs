//! Role-tagged product items.
//!
//! The inventory is produced by an upstream classifier and is read-only once
//! it reaches the resolver.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::geometry::Size;

/// Intended visual prominence of a product image.
///
/// Declaration order is the canonical inventory order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Hero,
    Large,
    Medium,
    Small,
    Tiny,
    Support,
    Cluster,
}

impl Role {
    /// Every role, in canonical order.
    pub const ALL: [Role; 7] = [
        Role::Hero,
        Role::Large,
        Role::Medium,
        Role::Small,
        Role::Tiny,
        Role::Support,
        Role::Cluster,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Hero => "hero",
            Role::Large => "large",
            Role::Medium => "medium",
            Role::Small => "small",
            Role::Tiny => "tiny",
            Role::Support => "support",
            Role::Cluster => "cluster",
        }
    }

    /// Footprint rank: larger values are smaller products and render on top.
    pub fn depth_rank(&self) -> u8 {
        match self {
            Role::Hero => 0,
            Role::Cluster => 1,
            Role::Large => 2,
            Role::Support => 3,
            Role::Medium => 4,
            Role::Small => 5,
            Role::Tiny => 6,
        }
    }

    /// The archetype group this role belongs to.
    pub fn group(&self) -> RoleGroup {
        match self {
            Role::Hero => RoleGroup::Hero,
            Role::Large | Role::Medium | Role::Support | Role::Cluster => RoleGroup::Support,
            Role::Small | Role::Tiny => RoleGroup::Accessory,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping used by the dynamic archetypes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoleGroup {
    Hero,
    Support,
    Accessory,
}

/// One product image: a stable key, a role and pixel dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub key: String,
    pub role: Role,
    pub size: Size,
    /// Caption drawn under the item on the storyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Item {
    /// Create an item. Width and height must both be non-zero.
    pub fn new(key: impl Into<String>, role: Role, width: u32, height: u32) -> Result<Self, ValidationError> {
        let key = key.into();
        if width == 0 || height == 0 {
            return Err(ValidationError::ZeroDimension { key, width, height });
        }
        Ok(Self {
            key,
            role,
            size: Size::new(width, height),
            label: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn aspect(&self) -> f64 {
        self.size.aspect()
    }
}

/// Ordered mapping from role to the items carrying it.
///
/// Keys are unique across the inventory; a colliding key gets a `_2`, `_3`…
/// suffix in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    items: BTreeMap<Role, Vec<Item>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, disambiguating its key if needed. Returns the final key.
    pub fn push(&mut self, mut item: Item) -> &str {
        if self.contains_key(&item.key) {
            let base = item.key.clone();
            let mut n = 2;
            while self.contains_key(&format!("{base}_{n}")) {
                n += 1;
            }
            item.key = format!("{base}_{n}");
        }
        let bucket = self.items.entry(item.role).or_default();
        bucket.push(item);
        &bucket[bucket.len() - 1].key
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, item: Item) -> Self {
        self.push(item);
        self
    }

    /// Add `count` items of one role and size, keyed `<role>`, `<role>_2`, ….
    pub fn with_many(mut self, role: Role, count: usize, width: u32, height: u32) -> Result<Self, ValidationError> {
        for _ in 0..count {
            self.push(Item::new(role.as_str(), role, width, height)?);
        }
        Ok(self)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.iter().any(|i| i.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Item> {
        self.iter().find(|i| i.key == key)
    }

    /// Items of one role, in insertion order.
    pub fn role(&self, role: Role) -> &[Item] {
        self.items.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count(&self, role: Role) -> usize {
        self.role(role).len()
    }

    /// Item count per role present in the inventory.
    pub fn counts(&self) -> BTreeMap<Role, usize> {
        self.items.iter().map(|(r, v)| (*r, v.len())).collect()
    }

    /// All items: roles in canonical order, items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose role belongs to `group`, in canonical order.
    pub fn group(&self, group: RoleGroup) -> Vec<&Item> {
        self.iter().filter(|i| i.role.group() == group).collect()
    }

    /// `hero×1, small×3` style summary for logs and error messages.
    pub fn describe_counts(&self) -> String {
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|(r, v)| format!("{r}×{}", v.len()))
            .collect();
        if parts.is_empty() {
            return String::from("empty");
        }
        parts.join(", ")
    }
}

impl FromIterator<Item> for Inventory {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let mut inv = Inventory::new();
        for item in iter {
            inv.push(item);
        }
        inv
    }
}
