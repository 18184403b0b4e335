//! Domain error model.

use thiserror::Error;

use crate::entity::EntityKind;
use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage
/// failures are modelled by the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    /// A structurally disallowed request (missing supplier on ENTRY, attempt to
    /// mutate immutable fields, deleting a movement or a current price, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested quantity exceeds the stock available at validation time.
    #[error(
        "insufficient stock for product {product_id}. Available: {available}, requested: {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// A concurrent transaction invalidated an optimistic check.
    #[error("conflict: {0}")]
    Conflict(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn not_found(entity: EntityKind, id: impl core::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn insufficient_stock(product_id: ProductId, available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            available,
            requested,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Whether a caller may retry the operation after re-reading state.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_reports_available_quantity() {
        let err = DomainError::insufficient_stock(ProductId::new(), 0, 1);
        assert!(err.to_string().contains("Available: 0"));
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let id = ProductId::new();
        let err = DomainError::not_found(EntityKind::Product, id);
        assert_eq!(err.to_string(), format!("product not found: {id}"));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(DomainError::conflict("stale row").is_conflict());
        assert!(!DomainError::invalid_argument("nope").is_conflict());
    }
}
