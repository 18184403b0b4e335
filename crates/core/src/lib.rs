//! `backoffice-core`: shared building blocks for the stock-consistency core.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the domain error taxonomy, money and row versions.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod version;

pub use entity::{Entity, EntityKind};
pub use error::{DomainError, DomainResult};
pub use id::{
    ClientId, MovementId, PriceId, ProductId, SaleDetailId, SaleId, SupplierId, UserId,
};
pub use money::Money;
pub use version::ExpectedVersion;
