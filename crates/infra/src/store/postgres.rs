//! Postgres-backed store.
//!
//! Row claims are `SELECT … FOR UPDATE` inside a `READ COMMITTED`
//! transaction: once the lock is granted the row is re-read at its latest
//! committed version, so concurrent adjustments to one product serialize and
//! adjustments to different products do not block each other.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Constraint` | Duplicate SKU or order number |
//! | Database (check violation) | `23514` | `Constraint` | Negative stock or quantity reached the table |
//! | Database (foreign key violation) | `23503` | `ForeignKey` | Unknown supplier or product |
//! | Database (serialization failure) | `40001` | `Transient` | Concurrent update conflict |
//! | Database (deadlock detected) | `40P01` | `Transient` | Lock cycle broken by the server |
//! | Database (connection exception) | `08xxx` | `Transient` | Server went away mid-transaction |
//! | Database (sequence limit) | `2200H` | `SequenceExhausted` | `order_number_seq` reached its maximum |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | Io / PoolTimedOut / Tls | N/A | `Transient` | Network errors, pool saturation |
//! | Other | N/A | `Backend` | Decode failures, closed pool, etc. |

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{FromRow, PgConnection, Postgres, Row, Transaction};
use tracing::{instrument, Span};
use uuid::Uuid;

use stockguard_audit::{AuditDetail, AuditKind, AuditRecord};
use stockguard_core::{AuditId, Money, MovementId, OrderId, OrderLineId, ProductId, SupplierId};
use stockguard_inventory::{InventoryMovement, MovementKind};
use stockguard_parties::Supplier;
use stockguard_products::{Product, Sku};
use stockguard_sales::{Order, OrderLine, OrderNumber, OrderStatus, PricedOrder};

use super::r#trait::{EntityCounts, OrderLineView, ReadStore, StockSnapshot, Store, StoreTx};
use crate::error::StoreError;

const SCHEMA: &str = include_str!("../../migrations/0001_commerce.sql");

/// Postgres-backed store. Cheap to clone (the pool is reference counted).
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema and create the order number sequence.
    ///
    /// Idempotent. An existing sequence keeps its position, so numbers are
    /// never reissued across restarts.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self, order_number_base: i64) -> Result<(), StoreError> {
        if order_number_base < 1 {
            return Err(StoreError::backend(format!(
                "order number base must be positive, got {order_number_base}"
            )));
        }
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;

        let create_sequence = format!(
            "CREATE SEQUENCE IF NOT EXISTS order_number_seq AS BIGINT START WITH {order_number_base} MINVALUE 1"
        );
        sqlx::raw_sql(&create_sequence)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PostgresTx { tx: Some(tx) }))
    }

    #[instrument(skip(self), err)]
    async fn next_order_number(&self) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>("SELECT nextval('order_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("next_order_number", e))
    }

    #[instrument(skip(self, suppliers), fields(count = suppliers.len()), err)]
    async fn insert_suppliers(&self, suppliers: &[Supplier]) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_suppliers", e))?;
        for s in suppliers {
            sqlx::query(r#"INSERT INTO suppliers (id, name, contact) VALUES ($1, $2, $3)"#)
                .bind(s.id.as_uuid())
                .bind(&s.name)
                .bind(&s.contact)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_suppliers", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_suppliers", e))
    }

    #[instrument(skip(self, products), fields(count = products.len()), err)]
    async fn insert_products(&self, products: &[Product]) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("insert_products", e))?;
        for p in products {
            sqlx::query(
                r#"
                INSERT INTO products (id, sku, name, unit_price, stock, supplier_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(p.id.as_uuid())
            .bind(p.sku.as_str())
            .bind(&p.name)
            .bind(p.unit_price.amount())
            .bind(p.stock)
            .bind(p.supplier_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_products", e))?;
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("insert_products", e))
    }

    #[instrument(skip(self), err)]
    async fn reset(&self, order_number_restart: i64) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("reset", e))?;
        // Children before parents.
        sqlx::query(
            r#"TRUNCATE TABLE order_lines, orders, inventory_movements, operations_log, products, suppliers"#,
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("reset", e))?;
        sqlx::query("SELECT setval('order_number_seq', $1, false)")
            .bind(order_number_restart)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reset", e))?;
        tx.commit().await.map_err(|e| map_sqlx_error("reset", e))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_sqlx_error("ping", e))
    }
}

/// One Postgres transaction. Dropping it unfinished rolls back.
struct PostgresTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresTx {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| StoreError::backend("transaction already finished"))
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn claim_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let conn = self.conn()?;
        let row = sqlx::query(
            r#"
            SELECT id, sku, name, unit_price, stock, supplier_id
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(conn)
        .await
        .map_err(|e| map_sqlx_error("claim_product", e))?;

        row.map(|r| decode::<ProductRow>(&r).and_then(Product::try_from))
            .transpose()
    }

    async fn write_stock(&mut self, id: ProductId, new_stock: i64) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let result = sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(new_stock)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("write_stock", e))?;
        if result.rows_affected() != 1 {
            return Err(StoreError::backend(format!("product {id} vanished under claim")));
        }
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> Result<(), StoreError> {
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (id, product_id, kind, quantity, note, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(movement.id.as_uuid())
        .bind(movement.product_id.as_uuid())
        .bind(movement.kind.as_str())
        .bind(movement.quantity)
        .bind(&movement.note)
        .bind(movement.occurred_at)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("insert_movement", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, order),
        fields(order_number = %order.order.number, lines = order.lines.len()),
        err
    )]
    async fn insert_order(&mut self, order: &PricedOrder) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let header = &order.order;
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, customer_name, total, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(header.id.as_uuid())
        .bind(header.number.value())
        .bind(&header.customer_name)
        .bind(header.total.amount())
        .bind(header.status.as_str())
        .bind(header.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for line in &order.lines {
            let line_no = i32::try_from(line.line_no).map_err(|_| {
                StoreError::Constraint(format!("line number {} out of range", line.line_no))
            })?;
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, line_no, product_id, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line_no)
            .bind(line.product_id.as_uuid())
            .bind(line.quantity)
            .bind(line.unit_price.amount())
            .bind(line.subtotal.amount())
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        }
        Ok(())
    }

    async fn append_audit(&mut self, record: &AuditRecord) -> Result<(), StoreError> {
        let (kind, details) = record
            .detail
            .to_parts()
            .map_err(|e| StoreError::backend(format!("failed to serialize audit details: {e}")))?;
        let conn = self.conn()?;
        sqlx::query(
            r#"
            INSERT INTO operations_log (id, operation_type, details, occurred_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(kind.as_str())
        .bind(details)
        .bind(record.occurred_at)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::backend("transaction already finished"))?;
        tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReadStore for PostgresStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"SELECT id, sku, name, unit_price, stock, supplier_id FROM products WHERE id = $1"#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("product", e))?;
        row.map(|r| decode::<ProductRow>(&r).and_then(Product::try_from))
            .transpose()
    }

    async fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM suppliers WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("supplier_exists", e))
    }

    async fn stock_levels(&self) -> Result<HashMap<ProductId, i64>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("stock_levels", e))?;
        fetch_stock_levels(&mut conn).await
    }

    async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, customer_name, total, status, created_at
            FROM orders
            ORDER BY created_at DESC, order_number DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_orders", e))?;
        rows.iter()
            .map(|r| decode::<OrderRow>(r).and_then(Order::try_from))
            .collect()
    }

    async fn first_order(&self) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, customer_name, total, status, created_at
            FROM orders
            ORDER BY created_at ASC, order_number ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("first_order", e))?;
        row.map(|r| decode::<OrderRow>(&r).and_then(Order::try_from))
            .transpose()
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.order_id, l.line_no, l.product_id, l.quantity, l.unit_price, l.subtotal,
                   p.sku, p.name AS product_name
            FROM order_lines l
            JOIN products p ON p.id = l.product_id
            WHERE l.order_id = $1
            ORDER BY l.line_no ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_lines", e))?;
        rows.iter()
            .map(|r| decode::<OrderLineRow>(r).and_then(OrderLineView::try_from))
            .collect()
    }

    async fn movements_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, kind, quantity, note, occurred_at
            FROM inventory_movements
            WHERE product_id = $1
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements_for", e))?;
        rows.iter()
            .map(|r| decode::<MovementRow>(r).and_then(InventoryMovement::try_from))
            .collect()
    }

    #[instrument(skip(self), fields(records), err)]
    async fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("audit_trail", e))?;
        let records = fetch_audit_trail(&mut conn).await?;
        Span::current().record("records", records.len());
        Ok(records)
    }

    /// Both reads run in one `REPEATABLE READ` transaction, which pins a
    /// single snapshot for every statement in it.
    #[instrument(skip(self), fields(records), err)]
    async fn stock_snapshot(&self) -> Result<StockSnapshot, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("stock_snapshot", e))?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("stock_snapshot", e))?;
        let stock = fetch_stock_levels(&mut tx).await?;
        let trail = fetch_audit_trail(&mut tx).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("stock_snapshot", e))?;
        Span::current().record("records", trail.len());
        Ok(StockSnapshot { stock, trail })
    }

    async fn recent_stock_updates(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, operation_type, details, occurred_at
            FROM operations_log
            WHERE operation_type = $1
            ORDER BY seq DESC
            LIMIT $2
            "#,
        )
        .bind(AuditKind::StockUpdate.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_stock_updates", e))?;
        rows.iter()
            .map(|r| decode::<AuditRow>(r).and_then(AuditRecord::try_from))
            .collect()
    }

    async fn audit_counts(&self) -> Result<BTreeMap<AuditKind, u64>, StoreError> {
        let rows = sqlx::query(
            r#"SELECT operation_type, COUNT(*) AS n FROM operations_log GROUP BY operation_type"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("audit_counts", e))?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let operation_type: String = row.try_get("operation_type").map_err(decode_error)?;
            let n: i64 = row.try_get("n").map_err(decode_error)?;
            let kind = AuditKind::parse(&operation_type).ok_or_else(|| {
                StoreError::backend(format!("unknown operation type in log: {operation_type}"))
            })?;
            counts.insert(kind, n as u64);
        }
        Ok(counts)
    }

    async fn entity_counts(&self) -> Result<EntityCounts, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM suppliers) AS suppliers,
                (SELECT COUNT(*) FROM products) AS products,
                (SELECT COUNT(*) FROM inventory_movements) AS inventory_movements,
                (SELECT COUNT(*) FROM orders) AS orders,
                (SELECT COUNT(*) FROM order_lines) AS order_lines,
                (SELECT COUNT(*) FROM operations_log) AS audit_records
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("entity_counts", e))?;
        let count = |column: &str| -> Result<u64, StoreError> {
            let n: i64 = row.try_get(column).map_err(decode_error)?;
            Ok(n as u64)
        };
        Ok(EntityCounts {
            suppliers: count("suppliers")?,
            products: count("products")?,
            inventory_movements: count("inventory_movements")?,
            orders: count("orders")?,
            order_lines: count("order_lines")?,
            audit_records: count("audit_records")?,
        })
    }
}

/// Map SQLx errors to `StoreError` (see the module docs for the table).
async fn fetch_stock_levels(
    conn: &mut PgConnection,
) -> Result<HashMap<ProductId, i64>, StoreError> {
    let rows = sqlx::query("SELECT id, stock FROM products")
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error("stock_levels", e))?;
    let mut levels = HashMap::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.try_get("id").map_err(decode_error)?;
        let stock: i64 = row.try_get("stock").map_err(decode_error)?;
        levels.insert(ProductId::from_uuid(id), stock);
    }
    Ok(levels)
}

async fn fetch_audit_trail(conn: &mut PgConnection) -> Result<Vec<AuditRecord>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, operation_type, details, occurred_at
        FROM operations_log
        ORDER BY seq ASC
        "#,
    )
    .fetch_all(conn)
    .await
    .map_err(|e| map_sqlx_error("audit_trail", e))?;
    rows.iter()
        .map(|r| decode::<AuditRow>(r).and_then(AuditRecord::try_from))
        .collect()
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23514") => StoreError::Constraint(msg),
                Some("23503") => StoreError::ForeignKey(msg),
                Some("40001") | Some("40P01") => StoreError::Transient(msg),
                Some("2200H") => StoreError::SequenceExhausted,
                Some(code) if code.starts_with("08") => StoreError::Transient(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => {
            StoreError::Transient(format!("connection failure in {}: {}", operation, err))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::backend(format!("failed to decode row: {err}"))
}

fn decode<T>(row: &PgRow) -> Result<T, StoreError>
where
    T: for<'r> FromRow<'r, PgRow>,
{
    T::from_row(row).map_err(decode_error)
}

fn corrupt(what: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::backend(format!("corrupt {what} row: {err}"))
}

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    unit_price: Decimal,
    stock: i64,
    supplier_id: Uuid,
}

impl<'r> sqlx::FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            unit_price: row.try_get("unit_price")?,
            stock: row.try_get("stock")?,
            supplier_id: row.try_get("supplier_id")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            sku: Sku::parse(&row.sku).map_err(|e| corrupt("product", e))?,
            name: row.name,
            unit_price: Money::new(row.unit_price).map_err(|e| corrupt("product", e))?,
            stock: row.stock,
            supplier_id: SupplierId::from_uuid(row.supplier_id),
        })
    }
}

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    order_number: i64,
    customer_name: String,
    total: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            order_number: row.try_get("order_number")?,
            customer_name: row.try_get("customer_name")?,
            total: row.try_get("total")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            number: OrderNumber::new(row.order_number),
            customer_name: row.customer_name,
            total: Money::new(row.total).map_err(|e| corrupt("order", e))?,
            status: OrderStatus::parse(&row.status).map_err(|e| corrupt("order", e))?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct OrderLineRow {
    id: Uuid,
    order_id: Uuid,
    line_no: i32,
    product_id: Uuid,
    quantity: i64,
    unit_price: Decimal,
    subtotal: Decimal,
    sku: String,
    product_name: String,
}

impl<'r> sqlx::FromRow<'r, PgRow> for OrderLineRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderLineRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            line_no: row.try_get("line_no")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            subtotal: row.try_get("subtotal")?,
            sku: row.try_get("sku")?,
            product_name: row.try_get("product_name")?,
        })
    }
}

impl TryFrom<OrderLineRow> for OrderLineView {
    type Error = StoreError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let line_no = u32::try_from(row.line_no).map_err(|e| corrupt("order line", e))?;
        Ok(OrderLineView {
            line: OrderLine {
                id: OrderLineId::from_uuid(row.id),
                order_id: OrderId::from_uuid(row.order_id),
                line_no,
                product_id: ProductId::from_uuid(row.product_id),
                quantity: row.quantity,
                unit_price: Money::new(row.unit_price).map_err(|e| corrupt("order line", e))?,
                subtotal: Money::new(row.subtotal).map_err(|e| corrupt("order line", e))?,
            },
            sku: Sku::parse(&row.sku).map_err(|e| corrupt("order line", e))?,
            product_name: row.product_name,
        })
    }
}

#[derive(Debug)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    kind: String,
    quantity: i64,
    note: String,
    occurred_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for MovementRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            note: row.try_get("note")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl TryFrom<MovementRow> for InventoryMovement {
    type Error = StoreError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(InventoryMovement {
            id: MovementId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            kind: MovementKind::from_str(&row.kind).map_err(|e| corrupt("movement", e))?,
            quantity: row.quantity,
            note: row.note,
            occurred_at: row.occurred_at,
        })
    }
}

#[derive(Debug)]
struct AuditRow {
    id: Uuid,
    operation_type: String,
    details: JsonValue,
    occurred_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for AuditRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AuditRow {
            id: row.try_get("id")?,
            operation_type: row.try_get("operation_type")?,
            details: row.try_get("details")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditRecord {
            id: AuditId::from_uuid(row.id),
            occurred_at: row.occurred_at,
            detail: AuditDetail::from_parts(&row.operation_type, row.details)
                .map_err(|e| corrupt("operations_log", e))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::sync::Arc;

    use sqlx::error::{DatabaseError, ErrorKind};
    use sqlx::postgres::PgPoolOptions;

    use stockguard_core::{DomainError, Money};
    use stockguard_parties::NewSupplier;
    use stockguard_products::NewProduct;

    use crate::catalog::Catalog;
    use crate::error::OperationError;
    use crate::movements::MovementProcessor;

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct CodedError {
        code: &'static str,
        message: String,
    }

    impl DatabaseError for CodedError {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                "23505" => ErrorKind::UniqueViolation,
                "23503" => ErrorKind::ForeignKeyViolation,
                "23514" => ErrorKind::CheckViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(CodedError {
            code,
            message: format!("failed with {code}"),
        }))
    }

    #[test]
    fn sqlstate_codes_map_to_store_errors() {
        assert!(matches!(map_sqlx_error("op", db_error("23505")), StoreError::Constraint(_)));
        assert!(matches!(map_sqlx_error("op", db_error("23514")), StoreError::Constraint(_)));
        assert!(matches!(map_sqlx_error("op", db_error("23503")), StoreError::ForeignKey(_)));
        assert!(matches!(map_sqlx_error("op", db_error("40001")), StoreError::Transient(_)));
        assert!(matches!(map_sqlx_error("op", db_error("40P01")), StoreError::Transient(_)));
        assert!(matches!(map_sqlx_error("op", db_error("08006")), StoreError::Transient(_)));
        assert!(matches!(map_sqlx_error("op", db_error("2200H")), StoreError::SequenceExhausted));
        assert!(matches!(map_sqlx_error("op", db_error("42P01")), StoreError::Backend(_)));
    }

    #[test]
    fn database_message_names_the_operation() {
        let err = map_sqlx_error("insert_order", db_error("23505"));
        assert_eq!(
            err,
            StoreError::Constraint("database error in insert_order: failed with 23505".into())
        );
    }

    #[test]
    fn connection_errors_are_retryable_and_the_rest_are_not() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(map_sqlx_error("op", sqlx::Error::Io(io)).is_retryable());
        assert!(map_sqlx_error("op", sqlx::Error::PoolTimedOut).is_retryable());
        assert!(matches!(map_sqlx_error("op", sqlx::Error::PoolClosed), StoreError::Backend(_)));
        assert!(matches!(map_sqlx_error("op", sqlx::Error::RowNotFound), StoreError::Backend(_)));
    }

    /// Needs a disposable database; every table in it is truncated.
    ///
    /// Run with: `DATABASE_URL=postgres://… cargo test -p stockguard-infra -- --ignored`
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore]
    async fn concurrent_withdrawals_serialize_on_row_locks() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        let store = PostgresStore::new(pool);
        store.migrate(1000).await.unwrap();
        store.reset(1000).await.unwrap();

        let catalog = Catalog::new(store.clone());
        let supplier = catalog
            .add_suppliers(vec![NewSupplier::new("Acme Supply", "orders@acme.test")])
            .await
            .unwrap()
            .remove(0);
        let product = catalog
            .add_products(vec![NewProduct {
                sku: "SKU-A".to_string(),
                name: "Product A".to_string(),
                unit_price: Money::from_cents(100),
                initial_stock: 10,
                supplier_id: supplier.id,
            }])
            .await
            .unwrap()
            .remove(0);

        let movements = Arc::new(MovementProcessor::new(store.clone()));
        let product_id = product.id;
        let tasks: Vec<_> = (0..2)
            .map(|i| {
                let movements = movements.clone();
                tokio::spawn(async move {
                    movements
                        .apply_movement(product_id, MovementKind::Out, 6, &format!("picker {i}"))
                        .await
                })
            })
            .collect();

        let mut ok = 0;
        let mut insufficient = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => ok += 1,
                Err(OperationError::Domain(DomainError::InsufficientStock {
                    available, requested, ..
                })) => {
                    assert_eq!((available, requested), (4, 6));
                    insufficient += 1;
                }
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }

        assert_eq!((ok, insufficient), (1, 1));
        assert_eq!(store.product(product.id).await.unwrap().unwrap().stock, 4);
        assert_eq!(store.entity_counts().await.unwrap().audit_records, 1);

        let snapshot = store.stock_snapshot().await.unwrap();
        assert_eq!(snapshot.stock.get(&product.id), Some(&4));
        assert_eq!(snapshot.trail.len(), 1);

        let duplicate = store.insert_products(&[product]).await.unwrap_err();
        assert!(matches!(duplicate, StoreError::Constraint(_)), "{duplicate:?}");
    }
}
