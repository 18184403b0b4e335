use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use backoffice_core::{
    ClientId, ExpectedVersion, MovementId, PriceId, ProductId, SaleId, SupplierId,
};
use backoffice_inventory::InventoryMovement;
use backoffice_parties::{Client, Supplier};
use backoffice_products::{Price, Product, current_prices};
use backoffice_sales::Sale;

use super::r#trait::{LedgerStore, LedgerTx};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    Product(ProductId),
    Supplier(SupplierId),
    Client(ClientId),
    Movement(MovementId),
    Price(PriceId),
    Sale(SaleId),
}

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    suppliers: BTreeMap<SupplierId, Supplier>,
    clients: BTreeMap<ClientId, Client>,
    movements: BTreeMap<MovementId, InventoryMovement>,
    prices: BTreeMap<PriceId, Price>,
    sales: BTreeMap<SaleId, Sale>,
}

impl Tables {
    /// Copy one row (or its absence) from `self` into `target`.
    fn copy_row(&self, target: &mut Tables, key: RowKey) {
        match key {
            RowKey::Product(id) => copy(&self.products, &mut target.products, id),
            RowKey::Supplier(id) => copy(&self.suppliers, &mut target.suppliers, id),
            RowKey::Client(id) => copy(&self.clients, &mut target.clients, id),
            RowKey::Movement(id) => copy(&self.movements, &mut target.movements, id),
            RowKey::Price(id) => copy(&self.prices, &mut target.prices, id),
            RowKey::Sale(id) => copy(&self.sales, &mut target.sales, id),
        }
    }
}

fn copy<K: Ord + Copy, V: Clone>(from: &BTreeMap<K, V>, to: &mut BTreeMap<K, V>, id: K) {
    match from.get(&id) {
        Some(row) => {
            to.insert(id, row.clone());
        }
        None => {
            to.remove(&id);
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Committed {
    tables: Tables,
    /// Bumped on every committed write of a row; never removed.
    versions: HashMap<RowKey, u64>,
}

/// In-memory Ledger Store.
///
/// Intended for tests/dev. Every transaction works on a private snapshot of
/// the committed state. At commit, each row the transaction locked or wrote
/// must still be at the version it saw (compare-and-swap), otherwise the
/// whole transaction is refused with `StoreError::Conflict`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<Committed>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let snapshot = self.state.read().map_err(|_| poisoned())?.clone();
        Ok(Box::new(InMemoryTx {
            state: Arc::clone(&self.state),
            snapshot,
            guarded: HashSet::new(),
            written: HashSet::new(),
        }))
    }
}

/// Transaction over an [`InMemoryLedgerStore`] snapshot.
#[derive(Debug)]
pub struct InMemoryTx {
    state: Arc<RwLock<Committed>>,
    snapshot: Committed,
    /// Rows whose version is compared at commit.
    guarded: HashSet<RowKey>,
    /// Rows copied into the committed state at commit.
    written: HashSet<RowKey>,
}

impl InMemoryTx {
    fn write(&mut self, key: RowKey) {
        self.guarded.insert(key);
        self.written.insert(key);
    }

    fn tables(&self) -> &Tables {
        &self.snapshot.tables
    }

    fn tables_mut(&mut self) -> &mut Tables {
        &mut self.snapshot.tables
    }

    fn ensure_single_current(&self, price: &Price) -> StoreResult<()> {
        if !price.is_current_price {
            return Ok(());
        }
        let other = current_prices(self.tables().prices.values(), price.product_id)
            .iter()
            .any(|p| p.id != price.id);
        if other {
            return Err(StoreError::Conflict(format!(
                "product {} already has a current price",
                price.product_id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for InMemoryTx {
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.tables().products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        // Taking the lock counts as a write so that two lockers of the same
        // row can never both commit.
        let product = self.tables().products.get(&id).cloned();
        if product.is_some() {
            self.write(RowKey::Product(id));
        }
        Ok(product)
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        Ok(self.tables().products.values().cloned().collect())
    }

    async fn supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        Ok(self.tables().suppliers.get(&id).cloned())
    }

    async fn client(&mut self, id: ClientId) -> StoreResult<Option<Client>> {
        Ok(self.tables().clients.get(&id).cloned())
    }

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        if self.tables().products.contains_key(&product.id) {
            return Err(StoreError::Conflict(format!("product {} already exists", product.id)));
        }
        if product.current_stock < 0 {
            return Err(StoreError::Constraint("current_stock cannot be negative".into()));
        }
        self.tables_mut().products.insert(product.id, product.clone());
        self.write(RowKey::Product(product.id));
        Ok(())
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        if self.tables().suppliers.contains_key(&supplier.id) {
            return Err(StoreError::Conflict(format!("supplier {} already exists", supplier.id)));
        }
        self.tables_mut().suppliers.insert(supplier.id, supplier.clone());
        self.write(RowKey::Supplier(supplier.id));
        Ok(())
    }

    async fn insert_client(&mut self, client: &Client) -> StoreResult<()> {
        if self.tables().clients.contains_key(&client.id) {
            return Err(StoreError::Conflict(format!("client {} already exists", client.id)));
        }
        self.tables_mut().clients.insert(client.id, client.clone());
        self.write(RowKey::Client(client.id));
        Ok(())
    }

    async fn set_product_active(&mut self, id: ProductId, active: bool) -> StoreResult<bool> {
        let Some(product) = self.tables_mut().products.get_mut(&id) else {
            return Ok(false);
        };
        product.is_active = active;
        self.write(RowKey::Product(id));
        Ok(true)
    }

    async fn set_supplier_active(&mut self, id: SupplierId, active: bool) -> StoreResult<bool> {
        let Some(supplier) = self.tables_mut().suppliers.get_mut(&id) else {
            return Ok(false);
        };
        supplier.is_active = active;
        self.write(RowKey::Supplier(id));
        Ok(true)
    }

    async fn set_client_active(&mut self, id: ClientId, active: bool) -> StoreResult<bool> {
        let Some(client) = self.tables_mut().clients.get_mut(&id) else {
            return Ok(false);
        };
        client.is_active = active;
        self.write(RowKey::Client(id));
        Ok(true)
    }

    async fn apply_stock_delta(&mut self, id: ProductId, delta: i64) -> StoreResult<Option<i64>> {
        let Some(product) = self.tables_mut().products.get_mut(&id) else {
            return Ok(None);
        };
        let updated = product
            .current_stock
            .checked_add(delta)
            .ok_or_else(|| StoreError::Constraint(format!("stock of product {id} overflows")))?;
        if updated < 0 {
            return Err(StoreError::Conflict(format!(
                "stock of product {id} would become negative ({updated})"
            )));
        }
        product.current_stock = updated;
        self.write(RowKey::Product(id));
        Ok(Some(updated))
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> StoreResult<()> {
        if self.tables().movements.contains_key(&movement.id) {
            return Err(StoreError::Conflict(format!("movement {} already exists", movement.id)));
        }
        self.tables_mut().movements.insert(movement.id, movement.clone());
        self.write(RowKey::Movement(movement.id));
        Ok(())
    }

    async fn movement(&mut self, id: MovementId) -> StoreResult<Option<InventoryMovement>> {
        Ok(self.tables().movements.get(&id).cloned())
    }

    async fn update_movement_notes(&mut self, movement: &InventoryMovement) -> StoreResult<bool> {
        let Some(stored) = self.tables_mut().movements.get_mut(&movement.id) else {
            return Ok(false);
        };
        stored.reason = movement.reason.clone();
        stored.notes = movement.notes.clone();
        self.write(RowKey::Movement(movement.id));
        Ok(true)
    }

    async fn movements_for_product(&mut self, id: ProductId) -> StoreResult<Vec<InventoryMovement>> {
        let mut rows: Vec<_> = self
            .tables()
            .movements
            .values()
            .filter(|m| m.product_id == id)
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.movement_date, m.id));
        Ok(rows)
    }

    async fn movements_for_sale(&mut self, id: SaleId) -> StoreResult<Vec<InventoryMovement>> {
        let mut rows: Vec<_> = self
            .tables()
            .movements
            .values()
            .filter(|m| m.sale_id == Some(id))
            .cloned()
            .collect();
        rows.sort_by_key(|m| (m.movement_date, m.id));
        Ok(rows)
    }

    async fn price(&mut self, id: PriceId) -> StoreResult<Option<Price>> {
        Ok(self.tables().prices.get(&id).cloned())
    }

    async fn current_price(&mut self, product_id: ProductId) -> StoreResult<Option<Price>> {
        Ok(self
            .tables()
            .prices
            .values()
            .find(|p| p.product_id == product_id && p.is_current_price)
            .cloned())
    }

    async fn prices_for_product(&mut self, product_id: ProductId) -> StoreResult<Vec<Price>> {
        let mut rows: Vec<_> = self
            .tables()
            .prices
            .values()
            .filter(|p| p.product_id == product_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.valid_from.cmp(&a.valid_from).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn demote_current_prices(
        &mut self,
        product_id: ProductId,
        keep: Option<PriceId>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut demoted = Vec::new();
        for price in self.tables_mut().prices.values_mut() {
            if price.product_id == product_id && price.is_current_price && Some(price.id) != keep {
                price.demote(at);
                demoted.push(price.id);
            }
        }
        for id in &demoted {
            self.write(RowKey::Price(*id));
        }
        Ok(demoted.len() as u64)
    }

    async fn insert_price(&mut self, price: &Price) -> StoreResult<()> {
        if self.tables().prices.contains_key(&price.id) {
            return Err(StoreError::Conflict(format!("price {} already exists", price.id)));
        }
        self.ensure_single_current(price)?;
        self.tables_mut().prices.insert(price.id, price.clone());
        self.write(RowKey::Price(price.id));
        Ok(())
    }

    async fn update_price(&mut self, price: &Price) -> StoreResult<bool> {
        if !self.tables().prices.contains_key(&price.id) {
            return Ok(false);
        }
        self.ensure_single_current(price)?;
        self.tables_mut().prices.insert(price.id, price.clone());
        self.write(RowKey::Price(price.id));
        Ok(true)
    }

    async fn delete_price(&mut self, id: PriceId) -> StoreResult<bool> {
        if self.tables_mut().prices.remove(&id).is_none() {
            return Ok(false);
        }
        self.write(RowKey::Price(id));
        Ok(true)
    }

    async fn insert_sale(&mut self, sale: &Sale) -> StoreResult<()> {
        if self.tables().sales.contains_key(&sale.id) {
            return Err(StoreError::Conflict(format!("sale {} already exists", sale.id)));
        }
        self.tables_mut().sales.insert(sale.id, sale.clone());
        self.write(RowKey::Sale(sale.id));
        Ok(())
    }

    async fn sale(&mut self, id: SaleId) -> StoreResult<Option<Sale>> {
        Ok(self.tables().sales.get(&id).cloned())
    }

    async fn update_sale_client(&mut self, id: SaleId, client_id: ClientId) -> StoreResult<bool> {
        let Some(sale) = self.tables_mut().sales.get_mut(&id) else {
            return Ok(false);
        };
        sale.client_id = client_id;
        self.write(RowKey::Sale(id));
        Ok(true)
    }

    async fn delete_sale(&mut self, id: SaleId) -> StoreResult<bool> {
        if self.tables_mut().sales.remove(&id).is_none() {
            return Ok(false);
        }
        self.write(RowKey::Sale(id));
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut live = self.state.write().map_err(|_| poisoned())?;

        for key in &self.guarded {
            let seen = self.snapshot.versions.get(key).copied();
            let current = live.versions.get(key).copied();
            ExpectedVersion::observed(seen)
                .check(current)
                .map_err(|_| {
                    StoreError::Conflict(format!(
                        "{key:?} changed since the transaction began (expected {seen:?}, found {current:?})"
                    ))
                })?;
        }

        for key in &self.written {
            self.snapshot.tables.copy_row(&mut live.tables, *key);
            *live.versions.entry(*key).or_insert(0) += 1;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        let mut p = Product::new("Widget", SupplierId::new(), 0, None).unwrap();
        p.current_stock = stock;
        p
    }

    async fn seeded(stock: i64) -> (InMemoryLedgerStore, ProductId) {
        let store = InMemoryLedgerStore::new();
        let p = product(stock);
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&p).await.unwrap();
        tx.commit().await.unwrap();
        (store, p.id)
    }

    #[tokio::test]
    async fn uncommitted_writes_are_invisible() {
        let (store, id) = seeded(5).await;

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.apply_stock_delta(id, -2).await.unwrap(), Some(3));
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.product(id).await.unwrap().unwrap().current_stock, 5);
    }

    #[tokio::test]
    async fn second_writer_of_a_row_conflicts() {
        let (store, id) = seeded(1).await;

        let mut a = store.begin().await.unwrap();
        let mut b = store.begin().await.unwrap();
        a.lock_product(id).await.unwrap();
        b.lock_product(id).await.unwrap();
        a.apply_stock_delta(id, -1).await.unwrap();
        b.apply_stock_delta(id, -1).await.unwrap();

        a.commit().await.unwrap();
        assert!(matches!(b.commit().await, Err(StoreError::Conflict(_))));

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.product(id).await.unwrap().unwrap().current_stock, 0);
    }

    #[tokio::test]
    async fn negative_stock_is_refused() {
        let (store, id) = seeded(2).await;
        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.apply_stock_delta(id, -3).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(tx.apply_stock_delta(ProductId::new(), 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn second_current_price_is_refused() {
        let (store, id) = seeded(0).await;
        let now = Utc::now();
        let current = |id| Price {
            id: PriceId::new(),
            product_id: id,
            purchase_price: "1.00".parse().unwrap(),
            selling_price: "2.00".parse().unwrap(),
            is_current_price: true,
            valid_from: now,
            valid_to: None,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_price(&current(id)).await.unwrap();
        assert!(matches!(
            tx.insert_price(&current(id)).await,
            Err(StoreError::Conflict(_))
        ));

        assert_eq!(tx.demote_current_prices(id, None, now).await.unwrap(), 1);
        tx.insert_price(&current(id)).await.unwrap();
        tx.commit().await.unwrap();
    }
}
