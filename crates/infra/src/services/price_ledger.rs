//! Price Ledger Manager: at most one current price per product.
//!
//! Every write that can change which price is current first takes the
//! product's row lock, then demotes, then writes the new current row. Two
//! concurrent promotions for the same product are therefore serialized and
//! the loser re-runs against the winner's result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument};

use backoffice_core::{DomainError, EntityKind, PriceId, ProductId};
use backoffice_products::{NewPrice, Price, PriceUpdate};

use crate::config::TransactionConfig;
use crate::error::LedgerResult;
use crate::runner::{UnitOfWork, run_in_transaction};
use crate::store::{LedgerStore, LedgerTx};

#[derive(Clone)]
pub struct PriceLedgerManager {
    store: Arc<dyn LedgerStore>,
    retries: u32,
}

impl PriceLedgerManager {
    pub fn new(store: Arc<dyn LedgerStore>, config: TransactionConfig) -> Self {
        Self {
            store,
            retries: config.conflict_retries,
        }
    }

    /// Create a price; with `is_current` it replaces the current one.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, is_current = input.is_current), err)]
    pub async fn create(&self, input: NewPrice) -> LedgerResult<Price> {
        input.validate()?;
        let price = run_in_transaction(self.store.as_ref(), self.retries, &Create { input }).await?;
        info!(price_id = %price.id, "price created");
        Ok(price)
    }

    /// Make a price the current one. Promoting the current price is a no-op.
    #[instrument(skip(self, id), fields(price_id = %id), err)]
    pub async fn promote(&self, id: PriceId) -> LedgerResult<Price> {
        let update = PriceUpdate {
            is_current_price: Some(true),
            ..Default::default()
        };
        let price = run_in_transaction(self.store.as_ref(), self.retries, &Update { id, update })
            .await?;
        info!(product_id = %price.product_id, "price promoted");
        Ok(price)
    }

    /// Update amounts and/or promote a price.
    #[instrument(skip(self, id, update), fields(price_id = %id), err)]
    pub async fn update(&self, id: PriceId, update: PriceUpdate) -> LedgerResult<Price> {
        run_in_transaction(self.store.as_ref(), self.retries, &Update { id, update }).await
    }

    /// Delete a non-current price.
    #[instrument(skip(self, id), fields(price_id = %id), err)]
    pub async fn retire(&self, id: PriceId) -> LedgerResult<()> {
        run_in_transaction(self.store.as_ref(), self.retries, &Retire { id }).await?;
        info!("price retired");
        Ok(())
    }

    pub async fn get(&self, id: PriceId) -> LedgerResult<Price> {
        let mut tx = self.store.begin().await?;
        let price = tx.price(id).await?;
        tx.rollback().await?;
        price.ok_or_else(|| DomainError::not_found(EntityKind::Price, id).into())
    }

    pub async fn current_price(&self, product_id: ProductId) -> LedgerResult<Option<Price>> {
        let mut tx = self.store.begin().await?;
        ensure_product(tx.as_mut(), product_id).await?;
        let price = tx.current_price(product_id).await?;
        tx.rollback().await?;
        Ok(price)
    }

    /// Price history of a product, newest first.
    pub async fn history(&self, product_id: ProductId) -> LedgerResult<Vec<Price>> {
        let mut tx = self.store.begin().await?;
        ensure_product(tx.as_mut(), product_id).await?;
        let prices = tx.prices_for_product(product_id).await?;
        tx.rollback().await?;
        Ok(prices)
    }
}

async fn ensure_product(tx: &mut dyn LedgerTx, product_id: ProductId) -> LedgerResult<()> {
    if tx.product(product_id).await?.is_none() {
        return Err(DomainError::not_found(EntityKind::Product, product_id).into());
    }
    Ok(())
}

async fn lock_product(tx: &mut dyn LedgerTx, product_id: ProductId) -> LedgerResult<()> {
    if tx.lock_product(product_id).await?.is_none() {
        return Err(DomainError::not_found(EntityKind::Product, product_id).into());
    }
    Ok(())
}

/// Read a price, lock its product, then read the price again under the lock.
async fn load_locked(tx: &mut dyn LedgerTx, id: PriceId) -> LedgerResult<Price> {
    let not_found = || DomainError::not_found(EntityKind::Price, id);
    let seen = tx.price(id).await?.ok_or_else(not_found)?;
    lock_product(tx, seen.product_id).await?;
    Ok(tx.price(id).await?.ok_or_else(not_found)?)
}

struct Create {
    input: NewPrice,
}

#[async_trait]
impl UnitOfWork for Create {
    type Output = Price;

    fn name(&self) -> &'static str {
        "create_price"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<Price> {
        lock_product(tx, self.input.product_id).await?;

        let now = Utc::now();
        if self.input.is_current {
            tx.demote_current_prices(self.input.product_id, None, now)
                .await?;
        }
        let price = self.input.clone().into_price(PriceId::new(), now);
        tx.insert_price(&price).await?;
        Ok(price)
    }
}

struct Update {
    id: PriceId,
    update: PriceUpdate,
}

#[async_trait]
impl UnitOfWork for Update {
    type Output = Price;

    fn name(&self) -> &'static str {
        "update_price"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<Price> {
        let mut price = load_locked(tx, self.id).await?;
        self.update.validate(&price)?;

        let unchanged = self.update.purchase_price.is_none()
            && self.update.selling_price.is_none()
            && !self.update.promotes(&price);
        if unchanged {
            return Ok(price);
        }

        if self.update.promotes(&price) {
            let now = Utc::now();
            tx.demote_current_prices(price.product_id, Some(price.id), now)
                .await?;
            price.promote();
        }
        price.apply_amounts(&self.update);
        tx.update_price(&price).await?;
        Ok(price)
    }
}

struct Retire {
    id: PriceId,
}

#[async_trait]
impl UnitOfWork for Retire {
    type Output = ();

    fn name(&self) -> &'static str {
        "retire_price"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<()> {
        let price = load_locked(tx, self.id).await?;
        price.ensure_deletable()?;
        tx.delete_price(price.id).await?;
        Ok(())
    }
}
