//! Transaction runner: begin, execute, commit or roll back, retry on conflict.
//!
//! ```text
//! begin ─► execute ─► commit ─► Ok
//!             │          │
//!             └─ Err ◄───┘ ─► rollback ─► Conflict and retries left? ─► begin
//! ```
//!
//! A unit of work re-reads everything it needs on each attempt, so a retry is
//! a full re-validation against the state the winning transaction left.

use async_trait::async_trait;
use tracing::warn;

use crate::error::LedgerResult;
use crate::store::{LedgerStore, LedgerTx};

/// A sequence of reads and writes that must commit as one.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Output: Send;

    /// Operation name used in logs.
    fn name(&self) -> &'static str;

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<Self::Output>;
}

/// Run `work` in its own transaction, re-running it up to `retries` more
/// times when the store reports a conflict.
pub async fn run_in_transaction<W>(
    store: &dyn LedgerStore,
    retries: u32,
    work: &W,
) -> LedgerResult<W::Output>
where
    W: UnitOfWork + ?Sized,
{
    let mut attempt = 0;
    loop {
        match attempt_once(store, work).await {
            Err(err) if err.is_conflict() && attempt < retries => {
                attempt += 1;
                warn!(
                    operation = work.name(),
                    attempt,
                    retries,
                    error = %err,
                    "transaction conflicted; re-validating"
                );
            }
            other => return other,
        }
    }
}

async fn attempt_once<W>(store: &dyn LedgerStore, work: &W) -> LedgerResult<W::Output>
where
    W: UnitOfWork + ?Sized,
{
    let mut tx = store.begin().await?;
    match work.execute(tx.as_mut()).await {
        Ok(output) => {
            tx.commit().await?;
            Ok(output)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(operation = work.name(), error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
