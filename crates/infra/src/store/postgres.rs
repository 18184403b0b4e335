//! Postgres-backed Ledger Store.
//!
//! Every [`LedgerTx`] is one `sqlx` transaction. Concurrent writers of the
//! same product are serialized by `SELECT … FOR UPDATE` in
//! [`LedgerTx::lock_product`]; the schema adds the last-line guards
//! (`CHECK (current_stock >= 0)` and a partial unique index allowing one
//! current price per product).
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Second current price, duplicate id |
//! | Database (check violation) | `23514` | `Conflict` | Stock would become negative |
//! | Database (serialization failure) | `40001` | `Conflict` | Concurrent transaction won |
//! | Database (deadlock detected) | `40P01` | `Conflict` | Concurrent transaction won |
//! | Database (foreign key violation) | `23503` | `Constraint` | Dangling reference |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | ColumnDecode / Decode | N/A | `Decode` | Row does not match the domain type |
//! | Other | N/A | `Backend` | Pool, network, protocol failures |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use backoffice_core::{
    ClientId, Money, MovementId, PriceId, ProductId, SaleDetailId, SaleId, SupplierId, UserId,
};
use backoffice_inventory::{InventoryMovement, MovementType};
use backoffice_parties::{Client, Supplier};
use backoffice_products::{Price, Product};
use backoffice_sales::{Sale, SaleDetail};

use super::r#trait::{LedgerStore, LedgerTx};
use crate::config::DatabaseConfig;
use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("../../migrations/0001_ledger.sql");

const PRODUCT_COLUMNS: &str =
    "id, name, supplier_id, current_stock, min_quantity, max_quantity, is_active";
const MOVEMENT_COLUMNS: &str = "id, movement_type, quantity, product_id, supplier_id, sale_id, \
     user_id, reason, notes, movement_date";
const PRICE_COLUMNS: &str =
    "id, product_id, purchase_price, selling_price, is_current_price, valid_from, valid_to";

/// Postgres Ledger Store over a connection pool.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized from `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout())
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the ledger tables if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn begin(&self) -> StoreResult<Box<dyn LedgerTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }
}

/// One open Postgres transaction.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTx {
    async fn fetch_product(&mut self, id: ProductId, lock: bool) -> StoreResult<Option<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1{}",
            if lock { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("product", e))?;
        row.map(|r| decode::<ProductRow>(&r).map(Product::from))
            .transpose()
    }

    async fn set_active(&mut self, table: &str, id: Uuid, active: bool) -> StoreResult<bool> {
        let sql = format!("UPDATE {table} SET is_active = $2 WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(active)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_active", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_movements(
        &mut self,
        filter: &str,
        id: Uuid,
    ) -> StoreResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE {filter} = $1 \
             ORDER BY movement_date ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("movements", e))?;
        rows.iter().map(movement_from_row).collect()
    }
}

#[async_trait]
impl LedgerTx for PostgresTx {
    async fn product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.fetch_product(id, false).await
    }

    async fn lock_product(&mut self, id: ProductId) -> StoreResult<Option<Product>> {
        self.fetch_product(id, true).await
    }

    async fn list_products(&mut self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        rows.iter()
            .map(|r| decode::<ProductRow>(r).map(Product::from))
            .collect()
    }

    async fn supplier(&mut self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        let row = sqlx::query("SELECT id, name, is_active FROM suppliers WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("supplier", e))?;
        row.as_ref()
            .map(|r| {
                decode::<DirectoryRow>(r).map(|d| Supplier {
                    id: SupplierId::from_uuid(d.id),
                    name: d.name,
                    is_active: d.is_active,
                })
            })
            .transpose()
    }

    async fn client(&mut self, id: ClientId) -> StoreResult<Option<Client>> {
        let row = sqlx::query("SELECT id, name, is_active FROM clients WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("client", e))?;
        row.as_ref()
            .map(|r| {
                decode::<DirectoryRow>(r).map(|d| Client {
                    id: ClientId::from_uuid(d.id),
                    name: d.name,
                    is_active: d.is_active,
                })
            })
            .transpose()
    }

    async fn insert_product(&mut self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, supplier_id, current_stock, min_quantity, max_quantity, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.supplier_id.as_uuid())
        .bind(product.current_stock)
        .bind(product.min_quantity)
        .bind(product.max_quantity)
        .bind(product.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn insert_supplier(&mut self, supplier: &Supplier) -> StoreResult<()> {
        sqlx::query("INSERT INTO suppliers (id, name, is_active) VALUES ($1, $2, $3)")
            .bind(supplier.id.as_uuid())
            .bind(&supplier.name)
            .bind(supplier.is_active)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_supplier", e))?;
        Ok(())
    }

    async fn insert_client(&mut self, client: &Client) -> StoreResult<()> {
        sqlx::query("INSERT INTO clients (id, name, is_active) VALUES ($1, $2, $3)")
            .bind(client.id.as_uuid())
            .bind(&client.name)
            .bind(client.is_active)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_client", e))?;
        Ok(())
    }

    async fn set_product_active(&mut self, id: ProductId, active: bool) -> StoreResult<bool> {
        self.set_active("products", *id.as_uuid(), active).await
    }

    async fn set_supplier_active(&mut self, id: SupplierId, active: bool) -> StoreResult<bool> {
        self.set_active("suppliers", *id.as_uuid(), active).await
    }

    async fn set_client_active(&mut self, id: ClientId, active: bool) -> StoreResult<bool> {
        self.set_active("clients", *id.as_uuid(), active).await
    }

    async fn apply_stock_delta(&mut self, id: ProductId, delta: i64) -> StoreResult<Option<i64>> {
        let row = sqlx::query(
            "UPDATE products SET current_stock = current_stock + $2 WHERE id = $1 RETURNING current_stock",
        )
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("apply_stock_delta", e))?;

        row.map(|r| r.try_get::<i64, _>("current_stock").map_err(decode_error))
            .transpose()
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements
                (id, movement_type, quantity, product_id, supplier_id, sale_id,
                 user_id, reason, notes, movement_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.movement_type.as_str())
        .bind(movement.quantity)
        .bind(movement.product_id.as_uuid())
        .bind(movement.supplier_id.map(|s| *s.as_uuid()))
        .bind(movement.sale_id.map(|s| *s.as_uuid()))
        .bind(movement.user_id.as_uuid())
        .bind(&movement.reason)
        .bind(&movement.notes)
        .bind(movement.movement_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;
        Ok(())
    }

    async fn movement(&mut self, id: MovementId) -> StoreResult<Option<InventoryMovement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM inventory_movements WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("movement", e))?;
        row.as_ref().map(movement_from_row).transpose()
    }

    async fn update_movement_notes(&mut self, movement: &InventoryMovement) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE inventory_movements SET reason = $2, notes = $3 WHERE id = $1")
                .bind(movement.id.as_uuid())
                .bind(&movement.reason)
                .bind(&movement.notes)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("update_movement_notes", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn movements_for_product(&mut self, id: ProductId) -> StoreResult<Vec<InventoryMovement>> {
        self.fetch_movements("product_id", *id.as_uuid()).await
    }

    async fn movements_for_sale(&mut self, id: SaleId) -> StoreResult<Vec<InventoryMovement>> {
        self.fetch_movements("sale_id", *id.as_uuid()).await
    }

    async fn price(&mut self, id: PriceId) -> StoreResult<Option<Price>> {
        let sql = format!("SELECT {PRICE_COLUMNS} FROM prices WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("price", e))?;
        row.map(|r| decode::<PriceRow>(&r).map(Price::from))
            .transpose()
    }

    async fn current_price(&mut self, product_id: ProductId) -> StoreResult<Option<Price>> {
        let sql =
            format!("SELECT {PRICE_COLUMNS} FROM prices WHERE product_id = $1 AND is_current_price");
        let row = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("current_price", e))?;
        row.map(|r| decode::<PriceRow>(&r).map(Price::from))
            .transpose()
    }

    async fn prices_for_product(&mut self, product_id: ProductId) -> StoreResult<Vec<Price>> {
        let sql = format!(
            "SELECT {PRICE_COLUMNS} FROM prices WHERE product_id = $1 ORDER BY valid_from DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(product_id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("prices_for_product", e))?;
        rows.iter()
            .map(|r| decode::<PriceRow>(r).map(Price::from))
            .collect()
    }

    async fn demote_current_prices(
        &mut self,
        product_id: ProductId,
        keep: Option<PriceId>,
        at: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE prices
            SET is_current_price = FALSE, valid_to = $3
            WHERE product_id = $1
              AND is_current_price
              AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(keep.map(|k| *k.as_uuid()))
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("demote_current_prices", e))?;
        Ok(result.rows_affected())
    }

    async fn insert_price(&mut self, price: &Price) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO prices
                (id, product_id, purchase_price, selling_price, is_current_price, valid_from, valid_to)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(price.id.as_uuid())
        .bind(price.product_id.as_uuid())
        .bind(price.purchase_price.amount())
        .bind(price.selling_price.amount())
        .bind(price.is_current_price)
        .bind(price.valid_from)
        .bind(price.valid_to)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_price", e))?;
        Ok(())
    }

    async fn update_price(&mut self, price: &Price) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prices
            SET purchase_price = $2, selling_price = $3, is_current_price = $4,
                valid_from = $5, valid_to = $6
            WHERE id = $1
            "#,
        )
        .bind(price.id.as_uuid())
        .bind(price.purchase_price.amount())
        .bind(price.selling_price.amount())
        .bind(price.is_current_price)
        .bind(price.valid_from)
        .bind(price.valid_to)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_price", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_price(&mut self, id: PriceId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM prices WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_price", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_sale(&mut self, sale: &Sale) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO sales (id, client_id, user_id, total_amount, sale_date) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(sale.id.as_uuid())
        .bind(sale.client_id.as_uuid())
        .bind(sale.user_id.as_uuid())
        .bind(sale.total_amount.amount())
        .bind(sale.sale_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sale", e))?;

        for (line_no, detail) in sale.details.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_details
                    (id, sale_id, product_id, line_no, quantity, unit_price, discount_amount, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(detail.id.as_uuid())
            .bind(sale.id.as_uuid())
            .bind(detail.product_id.as_uuid())
            .bind(line_no as i32)
            .bind(detail.quantity)
            .bind(detail.unit_price.amount())
            .bind(detail.discount_amount.amount())
            .bind(detail.subtotal.amount())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_sale_detail", e))?;
        }
        Ok(())
    }

    async fn sale(&mut self, id: SaleId) -> StoreResult<Option<Sale>> {
        let Some(header) = sqlx::query(
            "SELECT id, client_id, user_id, total_amount, sale_date FROM sales WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sale", e))?
        else {
            return Ok(None);
        };
        let header = decode::<SaleRow>(&header)?;

        let rows = sqlx::query(
            r#"
            SELECT id, sale_id, product_id, quantity, unit_price, discount_amount, subtotal
            FROM sale_details
            WHERE sale_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sale_details", e))?;

        let details = rows
            .iter()
            .map(|r| decode::<SaleDetailRow>(r).map(SaleDetail::from))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(Sale {
            id: SaleId::from_uuid(header.id),
            client_id: ClientId::from_uuid(header.client_id),
            user_id: UserId::from_uuid(header.user_id),
            total_amount: Money::new(header.total_amount),
            sale_date: header.sale_date,
            details,
        }))
    }

    async fn update_sale_client(&mut self, id: SaleId, client_id: ClientId) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE sales SET client_id = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(client_id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_sale_client", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_sale(&mut self, id: SaleId) -> StoreResult<bool> {
        sqlx::query("DELETE FROM sale_details WHERE sale_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sale_details", e))?;
        let result = sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sale", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

/// Map a SQLx error to a `StoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") | Some("40001") | Some("40P01") => {
                    StoreError::Conflict(msg)
                }
                Some("23503") => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Decode(format!("{operation}: {err}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Decode(err.to_string())
}

fn movement_from_row(row: &PgRow) -> StoreResult<InventoryMovement> {
    decode::<MovementRow>(row)?.try_into()
}

fn decode<T>(row: &PgRow) -> StoreResult<T>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(decode_error)
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    supplier_id: Uuid,
    current_stock: i64,
    min_quantity: i64,
    max_quantity: Option<i64>,
    is_active: bool,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            supplier_id: row.try_get("supplier_id")?,
            current_stock: row.try_get("current_stock")?,
            min_quantity: row.try_get("min_quantity")?,
            max_quantity: row.try_get("max_quantity")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            supplier_id: SupplierId::from_uuid(row.supplier_id),
            current_stock: row.current_stock,
            min_quantity: row.min_quantity,
            max_quantity: row.max_quantity,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug)]
struct DirectoryRow {
    id: Uuid,
    name: String,
    is_active: bool,
}

impl<'r> FromRow<'r, PgRow> for DirectoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(DirectoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            is_active: row.try_get("is_active")?,
        })
    }
}

#[derive(Debug)]
struct MovementRow {
    id: Uuid,
    movement_type: String,
    quantity: i64,
    product_id: Uuid,
    supplier_id: Option<Uuid>,
    sale_id: Option<Uuid>,
    user_id: Uuid,
    reason: Option<String>,
    notes: Option<String>,
    movement_date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            movement_type: row.try_get("movement_type")?,
            quantity: row.try_get("quantity")?,
            product_id: row.try_get("product_id")?,
            supplier_id: row.try_get("supplier_id")?,
            sale_id: row.try_get("sale_id")?,
            user_id: row.try_get("user_id")?,
            reason: row.try_get("reason")?,
            notes: row.try_get("notes")?,
            movement_date: row.try_get("movement_date")?,
        })
    }
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = StoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = row
            .movement_type
            .parse::<MovementType>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(InventoryMovement {
            id: MovementId::from_uuid(row.id),
            movement_type,
            quantity: row.quantity,
            product_id: ProductId::from_uuid(row.product_id),
            supplier_id: row.supplier_id.map(SupplierId::from_uuid),
            sale_id: row.sale_id.map(SaleId::from_uuid),
            user_id: UserId::from_uuid(row.user_id),
            reason: row.reason,
            notes: row.notes,
            movement_date: row.movement_date,
        })
    }
}

#[derive(Debug)]
struct PriceRow {
    id: Uuid,
    product_id: Uuid,
    purchase_price: Decimal,
    selling_price: Decimal,
    is_current_price: bool,
    valid_from: DateTime<Utc>,
    valid_to: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for PriceRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PriceRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            purchase_price: row.try_get("purchase_price")?,
            selling_price: row.try_get("selling_price")?,
            is_current_price: row.try_get("is_current_price")?,
            valid_from: row.try_get("valid_from")?,
            valid_to: row.try_get("valid_to")?,
        })
    }
}

impl From<PriceRow> for Price {
    fn from(row: PriceRow) -> Self {
        Price {
            id: PriceId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            purchase_price: Money::new(row.purchase_price),
            selling_price: Money::new(row.selling_price),
            is_current_price: row.is_current_price,
            valid_from: row.valid_from,
            valid_to: row.valid_to,
        }
    }
}

#[derive(Debug)]
struct SaleRow {
    id: Uuid,
    client_id: Uuid,
    user_id: Uuid,
    total_amount: Decimal,
    sale_date: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SaleRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleRow {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            user_id: row.try_get("user_id")?,
            total_amount: row.try_get("total_amount")?,
            sale_date: row.try_get("sale_date")?,
        })
    }
}

#[derive(Debug)]
struct SaleDetailRow {
    id: Uuid,
    sale_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_price: Decimal,
    discount_amount: Decimal,
    subtotal: Decimal,
}

impl<'r> FromRow<'r, PgRow> for SaleDetailRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SaleDetailRow {
            id: row.try_get("id")?,
            sale_id: row.try_get("sale_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            discount_amount: row.try_get("discount_amount")?,
            subtotal: row.try_get("subtotal")?,
        })
    }
}

impl From<SaleDetailRow> for SaleDetail {
    fn from(row: SaleDetailRow) -> Self {
        SaleDetail {
            id: SaleDetailId::from_uuid(row.id),
            sale_id: SaleId::from_uuid(row.sale_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            unit_price: Money::new(row.unit_price),
            discount_amount: Money::new(row.discount_amount),
            subtotal: Money::new(row.subtotal),
        }
    }
}
