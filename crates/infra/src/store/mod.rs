//! Ledger Store boundary.
//!
//! Services only talk to [`LedgerStore`] / [`LedgerTx`]. Two adapters ship:
//! [`InMemoryLedgerStore`] for tests/dev and [`PostgresLedgerStore`].

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, LedgerTx};
