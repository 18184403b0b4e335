//! Application services of the stock-consistency core.
//!
//! Flow: `SaleCoordinator` → `MovementRecorder` → `StockAdjuster` → store.
//! `PriceLedgerManager` works on the same store, a different entity family.

pub mod active_flag;
pub mod movement_recorder;
pub mod price_ledger;
pub mod sale_coordinator;
pub mod stock_adjuster;
pub mod stock_alerts;

use std::sync::Arc;

pub use active_flag::{ActiveFlag, ActiveFlagService, Clients, Products, Suppliers};
pub use movement_recorder::{MovementRecorder, RecordedMovement};
pub use price_ledger::PriceLedgerManager;
pub use sale_coordinator::SaleCoordinator;
pub use stock_adjuster::StockAdjuster;
pub use stock_alerts::{StockAlertService, StockAlerts};

use crate::config::TransactionConfig;
use crate::store::LedgerStore;

/// Every service wired to one store.
#[derive(Clone)]
pub struct LedgerServices {
    pub movements: MovementRecorder,
    pub prices: PriceLedgerManager,
    pub sales: SaleCoordinator,
    pub alerts: StockAlertService,
    pub flags: ActiveFlagService,
}

impl LedgerServices {
    pub fn new(store: Arc<dyn LedgerStore>, config: TransactionConfig) -> Self {
        Self {
            movements: MovementRecorder::new(Arc::clone(&store), config),
            prices: PriceLedgerManager::new(Arc::clone(&store), config),
            sales: SaleCoordinator::new(Arc::clone(&store), config),
            alerts: StockAlertService::new(Arc::clone(&store)),
            flags: ActiveFlagService::new(store, config),
        }
    }
}
