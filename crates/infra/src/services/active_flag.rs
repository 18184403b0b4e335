//! The "toggle active" capability over products, suppliers and clients.
//!
//! Each table gets a tag type implementing [`ActiveFlag`]; the service picks
//! the right repository at compile time from the tag:
//!
//! ```ignore
//! flags.set_active::<Suppliers>(supplier_id, false).await?;
//! ```

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use backoffice_core::{ClientId, DomainError, Entity, ProductId, SupplierId};
use backoffice_parties::{Client, Supplier};
use backoffice_products::Product;

use crate::config::TransactionConfig;
use crate::error::{LedgerResult, StoreResult};
use crate::runner::{UnitOfWork, run_in_transaction};
use crate::store::{LedgerStore, LedgerTx};

/// Typed repository for an entity carrying an `is_active` flag.
#[async_trait]
pub trait ActiveFlag: 'static {
    type Id: Copy + Send + Sync + Display + 'static;
    type Entity: Entity<Id = Self::Id> + Send + 'static;

    async fn find_by_id(tx: &mut dyn LedgerTx, id: Self::Id) -> StoreResult<Option<Self::Entity>>;

    /// Returns `false` when the row does not exist.
    async fn write_active(tx: &mut dyn LedgerTx, id: Self::Id, active: bool) -> StoreResult<bool>;
}

/// Tag: the products table.
pub enum Products {}

/// Tag: the suppliers table.
pub enum Suppliers {}

/// Tag: the clients table.
pub enum Clients {}

#[async_trait]
impl ActiveFlag for Products {
    type Id = ProductId;
    type Entity = Product;

    async fn find_by_id(tx: &mut dyn LedgerTx, id: ProductId) -> StoreResult<Option<Product>> {
        tx.product(id).await
    }

    async fn write_active(tx: &mut dyn LedgerTx, id: ProductId, active: bool) -> StoreResult<bool> {
        tx.set_product_active(id, active).await
    }
}

#[async_trait]
impl ActiveFlag for Suppliers {
    type Id = SupplierId;
    type Entity = Supplier;

    async fn find_by_id(tx: &mut dyn LedgerTx, id: SupplierId) -> StoreResult<Option<Supplier>> {
        tx.supplier(id).await
    }

    async fn write_active(tx: &mut dyn LedgerTx, id: SupplierId, active: bool) -> StoreResult<bool> {
        tx.set_supplier_active(id, active).await
    }
}

#[async_trait]
impl ActiveFlag for Clients {
    type Id = ClientId;
    type Entity = Client;

    async fn find_by_id(tx: &mut dyn LedgerTx, id: ClientId) -> StoreResult<Option<Client>> {
        tx.client(id).await
    }

    async fn write_active(tx: &mut dyn LedgerTx, id: ClientId, active: bool) -> StoreResult<bool> {
        tx.set_client_active(id, active).await
    }
}

#[derive(Clone)]
pub struct ActiveFlagService {
    store: Arc<dyn LedgerStore>,
    retries: u32,
}

impl ActiveFlagService {
    pub fn new(store: Arc<dyn LedgerStore>, config: TransactionConfig) -> Self {
        Self {
            store,
            retries: config.conflict_retries,
        }
    }

    pub async fn find_by_id<T: ActiveFlag>(&self, id: T::Id) -> LedgerResult<T::Entity> {
        let mut tx = self.store.begin().await?;
        let found = T::find_by_id(tx.as_mut(), id).await?;
        tx.rollback().await?;
        found.ok_or_else(|| DomainError::not_found(<T::Entity as Entity>::KIND, id).into())
    }

    #[instrument(skip(self, id), fields(id = %id), err)]
    pub async fn set_active<T: ActiveFlag>(&self, id: T::Id, active: bool) -> LedgerResult<T::Entity> {
        let work = SetActive::<T> {
            id,
            active,
            tag: PhantomData,
        };
        let entity = run_in_transaction(self.store.as_ref(), self.retries, &work).await?;
        let kind = <T::Entity as Entity>::KIND;
        info!(kind = %kind, active, "active flag set");
        Ok(entity)
    }
}

struct SetActive<T: ActiveFlag> {
    id: T::Id,
    active: bool,
    tag: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T: ActiveFlag> UnitOfWork for SetActive<T> {
    type Output = T::Entity;

    fn name(&self) -> &'static str {
        "set_active"
    }

    async fn execute(&self, tx: &mut dyn LedgerTx) -> LedgerResult<T::Entity> {
        let kind = <T::Entity as Entity>::KIND;
        if !T::write_active(tx, self.id, self.active).await? {
            return Err(DomainError::not_found(kind, self.id).into());
        }
        T::find_by_id(tx, self.id)
            .await?
            .ok_or_else(|| DomainError::not_found(kind, self.id).into())
    }
}
