//! Sale Transaction Coordinator.
//!
//! Create: lock the involved products, validate every line against live
//! stock and current prices, then write sale, details, EXIT movements and
//! stock decrements in the same transaction. Cancel is the exact inverse.
//!
//! Products are always locked in id order so that two sales touching the
//! same products cannot deadlock each other.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, instrument};

use backoffice_core::{DomainError, EntityKind, ProductId, SaleId, UserId};
use backoffice_inventory::{MovementOrigin, RecordMovement};
use backoffice_sales::{Catalog, CatalogEntry, CreateSale, Sale, SalePlan, SaleState, UpdateSale};

use crate::config::TransactionConfig;
use crate::error::LedgerResult;
use crate::runner::{UnitOfWork, run_in_transaction};
use crate::services::movement_recorder::MovementRecorder;
use crate::store::{LedgerStore, LedgerTx};

#[derive(Clone)]
pub struct SaleCoordinator {
    store: Arc<dyn LedgerStore>,
    retries: u32,
}

impl SaleCoordinator {
    pub fn new(store: Arc<dyn LedgerStore>, config: TransactionConfig) -> Self {
        Self {
            store,
            retries: config.conflict_retries,
        }
    }

    /// Validate and commit a sale. Nothing is written unless every line passes.
    #[instrument(
        skip(self, cmd),
        fields(client_id = %cmd.client_id, lines = cmd.lines.len()),
        err
    )]
    pub async fn create(&self, cmd: CreateSale) -> LedgerResult<Sale> {
        let outcome = run_in_transaction(self.store.as_ref(), self.retries, &Create { cmd }).await;
        match &outcome {
            Ok(sale) => {
                transition(SaleState::Validating, SaleState::Committed);
                info!(sale_id = %sale.id, total_amount = %sale.total_amount, "sale committed");
            }
            Err(_) => transition(SaleState::Validating, SaleState::Rejected),
        }
        outcome
    }

    /// Reverse a sale: put its stock back with compensating ENTRY movements,
    /// then delete the sale and its details. Returns the removed sale.
    #[instrument(skip(self, id, cancelled_by), fields(sale_id = %id, cancelled_by = %cancelled_by), err)]
    pub async fn cancel(&self, id: SaleId, cancelled_by: UserId) -> LedgerResult<Sale> {
        let sale = run_in_transaction(
            self.store.as_ref(),
            self.retries,
            &Cancel { id, cancelled_by },
        )
        .await?;
        transition(SaleState::Committed, SaleState::Reversed);
        info!(lines = sale.details.len(), "sale reversed");
        Ok(sale)
    }

    /// Non-structural update; never touches stock, movements or totals.
    #[instrument(skip(self, id, update), fields(sale_id = %id), err)]
    pub async fn update(&self, id: SaleId, update: UpdateSale) -> LedgerResult<Sale> {
        run_in_transaction(self.store.as_ref(), self.retries, &Update { id, update }).await
    }

    pub async fn get(&self, id: SaleId) -> LedgerResult<Sale> {
        let mut tx = self.store.begin().await?;
        let sale = tx.sale(id).await?;
        tx.rollback().await?;
        sale.ok_or_else(|| DomainError::not_found(EntityKind::Sale, id).into())
    }
}

fn transition(from: SaleState, to: SaleState) {
    debug_assert!(from.can_transition_to(to));
    debug!(from = from.as_str(), to = to.as_str(), "sale state");
}

/// Lock `ids` in order and read what planning needs about each.
///
/// Unknown products are left out; planning reports them per line.
async fn load_catalog(
    tx: &mut dyn LedgerTx,
    ids: BTreeSet<ProductId>,
) -> LedgerResult<Catalog> {
    let mut catalog = Catalog::new();
    for id in ids {
        let Some(product) = tx.lock_product(id).await? else {
            continue;
        };
        let current_price = tx.current_price(id).await?;
        catalog.insert(
            id,
            CatalogEntry {
                product,
                current_price,
            },
        );
    }
    Ok(catalog)
}

struct Create {
    cmd: CreateSale,
}

#[async_trait]
impl UnitOfWork for Create {
    type Output = Sale;

    fn name(&self) -> &'static str {
        "create_sale"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<Sale> {
        let cmd = &self.cmd;
        let client = tx
            .client(cmd.client_id)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Client, cmd.client_id))?;
        client.ensure_can_buy()?;

        let ids = cmd.lines.iter().map(|l| l.product_id).collect();
        let catalog = load_catalog(tx, ids).await?;
        let plan = SalePlan::build(cmd, &catalog)?;

        let sale = plan.into_sale(SaleId::new(), Utc::now());
        tx.insert_sale(&sale).await?;
        for detail in &sale.details {
            let exit =
                RecordMovement::sale_exit(detail.product_id, detail.quantity, sale.id, sale.user_id);
            MovementRecorder::record_in(tx, exit, MovementOrigin::Sale).await?;
        }
        Ok(sale)
    }
}

struct Cancel {
    id: SaleId,
    cancelled_by: UserId,
}

#[async_trait]
impl UnitOfWork for Cancel {
    type Output = Sale;

    fn name(&self) -> &'static str {
        "cancel_sale"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<Sale> {
        let sale = tx
            .sale(self.id)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Sale, self.id))?;

        let ids: BTreeSet<ProductId> = sale.details.iter().map(|d| d.product_id).collect();
        for id in ids {
            tx.lock_product(id).await?;
        }

        for detail in &sale.details {
            let entry = RecordMovement::sale_reversal(
                detail.product_id,
                detail.quantity,
                sale.id,
                self.cancelled_by,
            );
            MovementRecorder::record_in(tx, entry, MovementOrigin::SaleCancellation).await?;
        }

        if !tx.delete_sale(sale.id).await? {
            return Err(DomainError::not_found(EntityKind::Sale, sale.id).into());
        }
        Ok(sale)
    }
}

struct Update {
    id: SaleId,
    update: UpdateSale,
}

#[async_trait]
impl UnitOfWork for Update {
    type Output = Sale;

    fn name(&self) -> &'static str {
        "update_sale"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<Sale> {
        let mut sale = tx
            .sale(self.id)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Sale, self.id))?;

        if let Some(client_id) = self.update.client_id {
            let client = tx
                .client(client_id)
                .await?
                .ok_or_else(|| DomainError::not_found(EntityKind::Client, client_id))?;
            client.ensure_can_buy()?;
            tx.update_sale_client(sale.id, client_id).await?;
            sale.client_id = client_id;
        }
        Ok(sale)
    }
}
