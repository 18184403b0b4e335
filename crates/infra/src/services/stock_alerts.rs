//! Stock alerts and ledger reconciliation (read-only).

use std::sync::Arc;

use serde::Serialize;
use tracing::{instrument, warn};

use backoffice_core::{DomainError, EntityKind, ProductId};
use backoffice_inventory::{LedgerSummary, Reconciliation};
use backoffice_products::{Product, StockLevel};

use crate::error::LedgerResult;
use crate::store::{LedgerStore, LedgerTx};

/// Products outside their configured thresholds, ordered by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockAlerts {
    pub low: Vec<Product>,
    pub high: Vec<Product>,
}

impl StockAlerts {
    pub fn is_empty(&self) -> bool {
        self.low.is_empty() && self.high.is_empty()
    }
}

#[derive(Clone)]
pub struct StockAlertService {
    store: Arc<dyn LedgerStore>,
}

impl StockAlertService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub fn classify(product: &Product) -> StockLevel {
        product.stock_level()
    }

    /// Active products below their minimum or above their maximum.
    #[instrument(skip(self), err)]
    pub async fn stock_alerts(&self) -> LedgerResult<StockAlerts> {
        let mut tx = self.store.begin().await?;
        let mut products = tx.list_products().await?;
        tx.rollback().await?;

        products.sort_by_key(|p| p.id);
        let mut alerts = StockAlerts::default();
        for product in products.into_iter().filter(|p| p.is_active) {
            match Self::classify(&product) {
                StockLevel::Low => alerts.low.push(product),
                StockLevel::High => alerts.high.push(product),
                StockLevel::Normal => {}
            }
        }
        Ok(alerts)
    }

    /// Compare a product's stock counter with the net of its ledger.
    #[instrument(skip(self, product_id), fields(product_id = %product_id), err)]
    pub async fn reconcile(&self, product_id: ProductId) -> LedgerResult<Reconciliation> {
        let mut tx = self.store.begin().await?;
        let product = tx
            .product(product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Product, product_id))?;
        let report = reconcile_in(tx.as_mut(), &product).await?;
        tx.rollback().await?;
        Ok(report)
    }

    /// Reconcile every product, ordered by product id.
    #[instrument(skip(self), err)]
    pub async fn reconcile_all(&self) -> LedgerResult<Vec<Reconciliation>> {
        let mut tx = self.store.begin().await?;
        let mut products = tx.list_products().await?;
        products.sort_by_key(|p| p.id);

        let mut reports = Vec::with_capacity(products.len());
        for product in &products {
            reports.push(reconcile_in(tx.as_mut(), product).await?);
        }
        tx.rollback().await?;
        Ok(reports)
    }
}

async fn reconcile_in(tx: &mut dyn LedgerTx, product: &Product) -> LedgerResult<Reconciliation> {
    let movements = tx.movements_for_product(product.id).await?;
    let report = Reconciliation::new(
        product.id,
        product.current_stock,
        LedgerSummary::from_movements(&movements),
    );
    if !report.consistent {
        warn!(
            product_id = %product.id,
            recorded_stock = report.recorded_stock,
            ledger_net = report.ledger_net,
            drift = report.drift(),
            "stock counter drifted from its ledger"
        );
    }
    Ok(report)
}
