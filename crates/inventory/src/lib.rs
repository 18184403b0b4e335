//! Inventory module: the append-only movement ledger.
//!
//! This crate contains business rules for inventory movements, implemented
//! purely as deterministic domain logic (no IO, no storage). Persisting a
//! movement and applying its stock delta happen together in
//! `backoffice-infra`.

pub mod ledger;
pub mod movement;

pub use ledger::{LedgerSummary, Reconciliation};
pub use movement::{
    InventoryMovement, MovementOrigin, MovementType, MovementUpdate, RecordMovement, reason,
};
