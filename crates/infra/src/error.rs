//! Infrastructure and service-level errors.
//!
//! `StoreError` covers what can go wrong inside a Ledger Store adapter.
//! `LedgerError` is what the services return: either a deterministic
//! `DomainError` or a store failure. A store-reported conflict is lifted into
//! `DomainError::Conflict` so callers only have one conflict case to match.

use thiserror::Error;

use backoffice_core::DomainError;

pub type StoreResult<T> = Result<T, StoreError>;
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger Store operation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A concurrent transaction changed a row this one depends on, or a write
    /// would have broken a store-enforced invariant (negative stock, second
    /// current price).
    #[error("concurrent modification: {0}")]
    Conflict(String),

    /// Referential or other integrity violation not caused by concurrency.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Connection, pool or protocol failure.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A stored row could not be turned back into a domain value.
    #[error("failed to decode row: {0}")]
    Decode(String),
}

/// Error returned by every service operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(DomainError),

    #[error(transparent)]
    Store(StoreError),
}

impl LedgerError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Domain(e) if e.is_conflict())
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            LedgerError::Store(_) => None,
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        LedgerError::Domain(value)
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => LedgerError::Domain(DomainError::Conflict(msg)),
            other => LedgerError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_becomes_domain_conflict() {
        let err: LedgerError = StoreError::Conflict("row 1 changed".into()).into();
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "conflict: row 1 changed");
    }

    #[test]
    fn backend_failures_stay_store_errors() {
        let err: LedgerError = StoreError::Backend("pool closed".into()).into();
        assert!(!err.is_conflict());
        assert!(err.as_domain().is_none());
    }
}
