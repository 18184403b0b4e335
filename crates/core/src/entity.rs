//! Entity trait: identity + the closed set of entity kinds the core touches.

use serde::{Deserialize, Serialize};

/// Kind tag of every entity the stock core can reference.
///
/// Used in `NotFound` errors and to select typed repositories at compile time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Product,
    Supplier,
    Client,
    Sale,
    Price,
    Movement,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Product => "product",
            EntityKind::Supplier => "supplier",
            EntityKind::Client => "client",
            EntityKind::Sale => "sale",
            EntityKind::Price => "price",
            EntityKind::Movement => "movement",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Kind tag of this entity.
    const KIND: EntityKind;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
