//! Stock Adjuster: the only writer of `current_stock`.

use tracing::debug;

use backoffice_core::{DomainError, EntityKind, ProductId};

use crate::error::LedgerResult;
use crate::store::LedgerTx;

/// Applies signed deltas to a product's stock counter.
///
/// Runs inside the caller's transaction and never commits. It does not check
/// availability: callers validate first, the store refuses a negative result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockAdjuster;

impl StockAdjuster {
    /// Add `delta` to the product's stock and return the new value.
    pub async fn adjust(
        tx: &mut dyn LedgerTx,
        product_id: ProductId,
        delta: i64,
    ) -> LedgerResult<i64> {
        let updated = tx
            .apply_stock_delta(product_id, delta)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Product, product_id))?;
        debug!(%product_id, delta, updated, "stock adjusted");
        Ok(updated)
    }
}
