use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use backoffice_core::{ClientId, MovementId, PriceId, ProductId, SaleId, SupplierId};
use backoffice_inventory::InventoryMovement;
use backoffice_parties::{Client, Supplier};
use backoffice_products::{Price, Product};
use backoffice_sales::Sale;

use crate::error::StoreResult;

/// Durable home of products, movements, prices and sales.
///
/// The store only hands out transactions. Every read and write of the stock
/// core goes through a [`LedgerTx`] so that a unit of work either commits as
/// a whole or leaves nothing behind.
///
/// ## Concurrency
///
/// Implementations must serialize conflicting writes to the same product row.
/// A transaction that lost such a race reports [`StoreError::Conflict`] (at
/// the offending statement or at commit), never a partial commit.
///
/// [`StoreError::Conflict`]: crate::error::StoreError::Conflict
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        (**self).begin().await
    }
}

/// One open transaction against a [`LedgerStore`].
///
/// Dropping the handle without calling [`LedgerTx::commit`] rolls back.
/// Lookups return `Ok(None)` for missing rows; turning that into a `NotFound`
/// is the caller's decision.
#[async_trait]
pub trait LedgerTx: Send {
    // ---- directories -------------------------------------------------

    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Read a product and take its row lock for the rest of the transaction.
    ///
    /// Every write that depends on a product's stock or current price goes
    /// through this first, which is how concurrent writers are serialized.
    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn list_products(&mut self) -> StoreResult<Vec<Product>>;

    async fn supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>>;

    async fn client(&mut self, id: ClientId) -> StoreResult<Option<Client>>;

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()>;

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()>;

    async fn insert_client(&mut self, client: &Client) -> StoreResult<()>;

    /// Returns `false` when the product does not exist.
    async fn set_product_active(&mut self, id: ProductId, active: bool) -> StoreResult<bool>;

    async fn set_supplier_active(&mut self, id: SupplierId, active: bool) -> StoreResult<bool>;

    async fn set_client_active(&mut self, id: ClientId, active: bool) -> StoreResult<bool>;

    // ---- stock -------------------------------------------------------

    /// Add `delta` to the product's `current_stock` and return the new value.
    ///
    /// `Ok(None)` when the product does not exist. A result below zero is
    /// refused with `StoreError::Conflict` and nothing is written.
    async fn apply_stock_delta(&mut self, id: ProductId, delta: i64) -> StoreResult<Option<i64>>;

    // ---- movements ---------------------------------------------------

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> StoreResult<()>;

    async fn movement(&mut self, id: MovementId) -> StoreResult<Option<InventoryMovement>>;

    /// Persist `reason` and `notes` of an existing movement. Other fields are
    /// never written. Returns `false` when the movement does not exist.
    async fn update_movement_notes(&mut self, movement: &InventoryMovement) -> StoreResult<bool>;

    /// Movements of a product, oldest first.
    async fn movements_for_product(&mut self, id: ProductId) -> StoreResult<Vec<InventoryMovement>>;

    /// Movements referencing a sale, oldest first.
    async fn movements_for_sale(&mut self, id: SaleId) -> StoreResult<Vec<InventoryMovement>>;

    // ---- prices ------------------------------------------------------

    async fn price(&mut self, id: PriceId) -> StoreResult<Option<Price>>;

    async fn current_price(&mut self, product_id: ProductId) -> StoreResult<Option<Price>>;

    /// Price history of a product, newest `valid_from` first.
    async fn prices_for_product(&mut self, product_id: ProductId) -> StoreResult<Vec<Price>>;

    /// Demote every current price of the product except `keep`, closing its
    /// validity at `at`. Returns how many rows were demoted.
    async fn demote_current_prices(
        &mut self,
        product_id: ProductId,
        keep: Option<PriceId>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn insert_price(&mut self, price: &Price) -> StoreResult<()>;

    /// Overwrite the mutable columns of a price. Returns `false` when absent.
    async fn update_price(&mut self, price: &Price) -> StoreResult<bool>;

    async fn delete_price(&mut self, id: PriceId) -> StoreResult<bool>;

    // ---- sales -------------------------------------------------------

    /// Insert a sale together with its details.
    async fn insert_sale(&mut self, sale: &Sale) -> StoreResult<()>;

    /// A sale with its details.
    async fn sale(&mut self, id: SaleId) -> StoreResult<Option<Sale>>;

    async fn update_sale_client(&mut self, id: SaleId, client_id: ClientId) -> StoreResult<bool>;

    /// Delete a sale and its details.
    async fn delete_sale(&mut self, id: SaleId) -> StoreResult<bool>;

    // ---- lifecycle ---------------------------------------------------

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
