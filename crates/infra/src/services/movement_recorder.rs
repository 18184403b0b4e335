//! Movement Recorder: validates and persists ENTRY/EXIT movements.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use backoffice_core::{DomainError, EntityKind, MovementId, ProductId, SaleId};
use backoffice_inventory::{
    InventoryMovement, MovementOrigin, MovementType, MovementUpdate, RecordMovement,
};
use backoffice_parties::Supplier;
use backoffice_products::Product;
use backoffice_sales::SaleSummary;

use crate::config::TransactionConfig;
use crate::error::LedgerResult;
use crate::runner::{UnitOfWork, run_in_transaction};
use crate::services::stock_adjuster::StockAdjuster;
use crate::store::{LedgerStore, LedgerTx};

/// A persisted movement with its relations resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedMovement {
    pub movement: InventoryMovement,
    /// The product as it is after the movement was applied.
    pub product: Product,
    pub supplier: Option<Supplier>,
    pub sale: Option<SaleSummary>,
}

/// Records movements and keeps `current_stock` equal to the ledger net.
#[derive(Clone)]
pub struct MovementRecorder {
    store: Arc<dyn LedgerStore>,
    retries: u32,
}

impl MovementRecorder {
    pub fn new(store: Arc<dyn LedgerStore>, config: TransactionConfig) -> Self {
        Self {
            store,
            retries: config.conflict_retries,
        }
    }

    /// Record one manual movement in its own transaction.
    ///
    /// Sale-linked EXIT and compensating ENTRY movements are written by the
    /// sale coordinator only; their reasons are refused here.
    #[instrument(
        skip(self, cmd),
        fields(
            product_id = %cmd.product_id,
            movement_type = cmd.movement_type.as_str(),
            quantity = cmd.quantity
        ),
        err
    )]
    pub async fn record(&self, cmd: RecordMovement) -> LedgerResult<RecordedMovement> {
        let recorded =
            run_in_transaction(self.store.as_ref(), self.retries, &Record { cmd }).await?;
        info!(
            movement_id = %recorded.movement.id,
            current_stock = recorded.product.current_stock,
            "movement recorded"
        );
        Ok(recorded)
    }

    /// Record one movement inside an open transaction.
    ///
    /// Checks, in order: quantity and supplier presence, product, supplier,
    /// sale, then stock for EXIT. Nothing is written until all of them pass.
    pub(crate) async fn record_in(
        tx: &mut dyn LedgerTx,
        cmd: RecordMovement,
        origin: MovementOrigin,
    ) -> LedgerResult<RecordedMovement> {
        cmd.validate(origin)?;

        let product = tx
            .lock_product(cmd.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Product, cmd.product_id))?;
        if origin.requires_active_product() {
            product.ensure_active()?;
        }

        let supplier = match cmd.supplier_id {
            Some(id) => {
                let supplier = tx
                    .supplier(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(EntityKind::Supplier, id))?;
                if cmd.movement_type == MovementType::Entry {
                    supplier.ensure_can_deliver()?;
                }
                Some(supplier)
            }
            None => None,
        };

        let sale = match cmd.sale_id {
            Some(id) => Some(
                tx.sale(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(EntityKind::Sale, id))?
                    .summary(),
            ),
            None => None,
        };

        if cmd.movement_type == MovementType::Exit {
            product.ensure_available(cmd.quantity)?;
        }

        let movement = cmd.into_movement(MovementId::new(), Utc::now());
        let current_stock =
            StockAdjuster::adjust(tx, movement.product_id, movement.signed_quantity()).await?;
        tx.insert_movement(&movement).await?;

        Ok(RecordedMovement {
            movement,
            product: Product {
                current_stock,
                ..product
            },
            supplier,
            sale,
        })
    }

    /// Change `reason` and/or `notes` of a recorded movement.
    #[instrument(skip(self, id, update), fields(movement_id = %id), err)]
    pub async fn update(
        &self,
        id: MovementId,
        update: MovementUpdate,
    ) -> LedgerResult<InventoryMovement> {
        update.validate()?;
        run_in_transaction(self.store.as_ref(), self.retries, &Annotate { id, update }).await
    }

    /// Movements are never deleted; this always fails.
    #[instrument(skip(self, id), fields(movement_id = %id), err)]
    pub async fn delete(&self, id: MovementId) -> LedgerResult<()> {
        let movement = self.get(id).await?;
        movement.ensure_deletable()?;
        Ok(())
    }

    pub async fn get(&self, id: MovementId) -> LedgerResult<InventoryMovement> {
        let mut tx = self.store.begin().await?;
        let movement = tx.movement(id).await?;
        tx.rollback().await?;
        movement.ok_or_else(|| DomainError::not_found(EntityKind::Movement, id).into())
    }

    /// Ledger of a product, oldest first.
    pub async fn for_product(&self, product_id: ProductId) -> LedgerResult<Vec<InventoryMovement>> {
        let mut tx = self.store.begin().await?;
        if tx.product(product_id).await?.is_none() {
            return Err(DomainError::not_found(EntityKind::Product, product_id).into());
        }
        let movements = tx.movements_for_product(product_id).await?;
        tx.rollback().await?;
        Ok(movements)
    }

    /// Movements referencing a sale, including the compensating entries of a
    /// cancelled one.
    pub async fn for_sale(&self, sale_id: SaleId) -> LedgerResult<Vec<InventoryMovement>> {
        let mut tx = self.store.begin().await?;
        let movements = tx.movements_for_sale(sale_id).await?;
        let sale_exists = tx.sale(sale_id).await?.is_some();
        tx.rollback().await?;
        if movements.is_empty() && !sale_exists {
            return Err(DomainError::not_found(EntityKind::Sale, sale_id).into());
        }
        Ok(movements)
    }
}

struct Record {
    cmd: RecordMovement,
}

#[async_trait]
impl UnitOfWork for Record {
    type Output = RecordedMovement;

    fn name(&self) -> &'static str {
        "record_movement"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<RecordedMovement> {
        MovementRecorder::record_in(tx, self.cmd.clone(), MovementOrigin::Manual).await
    }
}

struct Annotate {
    id: MovementId,
    update: MovementUpdate,
}

#[async_trait]
impl UnitOfWork for Annotate {
    type Output = InventoryMovement;

    fn name(&self) -> &'static str {
        "annotate_movement"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<InventoryMovement> {
        let mut movement = tx
            .movement(self.id)
            .await?
            .ok_or_else(|| DomainError::not_found(EntityKind::Movement, self.id))?;
        self.update.apply(&mut movement);
        tx.update_movement_notes(&movement).await?;
        Ok(movement)
    }
}
