//! Row versions for optimistic concurrency.

use crate::error::{DomainError, DomainResult};

/// Optimistic concurrency expectation for a stored row.
///
/// Stores that do not lock rows compare the version a transaction read against
/// the committed version at commit time (compare-and-swap on a version column).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The row must not exist yet (insert).
    Absent,
    /// The row must still be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation derived from what a transaction observed.
    pub fn observed(version: Option<u64>) -> Self {
        match version {
            Some(v) => ExpectedVersion::Exact(v),
            None => ExpectedVersion::Absent,
        }
    }

    pub fn matches(self, actual: Option<u64>) -> bool {
        match (self, actual) {
            (ExpectedVersion::Absent, None) => true,
            (ExpectedVersion::Exact(v), Some(a)) => v == a,
            _ => false,
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_matches_only_missing_rows() {
        assert!(ExpectedVersion::Absent.matches(None));
        assert!(!ExpectedVersion::Absent.matches(Some(1)));
    }

    #[test]
    fn exact_rejects_stale_versions() {
        assert!(ExpectedVersion::Exact(3).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(3).matches(Some(4)));
        assert!(!ExpectedVersion::Exact(3).matches(None));

        let err = ExpectedVersion::Exact(3).check(Some(4)).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn observed_maps_missing_rows_to_absent() {
        assert_eq!(ExpectedVersion::observed(None), ExpectedVersion::Absent);
        assert_eq!(ExpectedVersion::observed(Some(7)), ExpectedVersion::Exact(7));
    }
}
