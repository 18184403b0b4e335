//! Infrastructure layer: Ledger Store adapters, services, configuration.

pub mod config;
pub mod error;
pub mod runner;
pub mod services;
pub mod store;

mod integration_tests;

pub use config::{DatabaseConfig, LedgerConfig, TransactionConfig};
pub use error::{LedgerError, LedgerResult, StoreError, StoreResult};
pub use runner::{UnitOfWork, run_in_transaction};
pub use services::LedgerServices;
pub use store::{InMemoryLedgerStore, LedgerStore, LedgerTx, PostgresLedgerStore};
