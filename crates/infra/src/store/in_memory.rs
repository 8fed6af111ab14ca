use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stockguard_audit::{AuditKind, AuditRecord};
use stockguard_core::{OrderId, ProductId, SupplierId};
use stockguard_inventory::InventoryMovement;
use stockguard_parties::Supplier;
use stockguard_products::Product;
use stockguard_sales::{Order, OrderLine, PricedOrder};

use super::r#trait::{EntityCounts, OrderLineView, ReadStore, StockSnapshot, Store, StoreTx};
use crate::config::DEFAULT_ORDER_NUMBER_BASE;
use crate::error::StoreError;

#[derive(Debug, Default)]
struct Tables {
    suppliers: HashMap<SupplierId, Supplier>,
    products: HashMap<ProductId, Product>,
    movements: Vec<InventoryMovement>,
    orders: Vec<Order>,
    order_lines: Vec<OrderLine>,
    /// Commit order.
    audit: Vec<AuditRecord>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    /// One claim token per product; held by a transaction until it ends.
    row_locks: Mutex<HashMap<ProductId, Arc<AsyncMutex<()>>>>,
    next_order_number: AtomicI64,
    fail_next_commit: AtomicBool,
}

/// Process-local store.
///
/// Intended for tests/dev. Committed rows live in one table set behind an
/// `RwLock`; row claims are per-product async mutexes so a transaction can
/// hold them across awaits. Writes are staged in the transaction and applied
/// at commit, before the claims are released.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_order_number_base(DEFAULT_ORDER_NUMBER_BASE)
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order_number_base(base: i64) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                next_order_number: AtomicI64::new(base),
                fail_next_commit: AtomicBool::new(false),
            }),
        }
    }

    /// Make the next commit fail with a transient error, as a dropped
    /// connection would. The transaction is discarded.
    pub fn fail_next_commit(&self) {
        self.shared.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Overwrite stock without a claim or an audit record.
    #[cfg(test)]
    pub(crate) fn tamper_stock(&self, id: ProductId, stock: i64) {
        if let Ok(mut tables) = self.shared.tables.write() {
            if let Some(product) = tables.products.get_mut(&id) {
                product.stock = stock;
            }
        }
    }

    fn read_tables(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.shared.tables.read().map_err(poisoned)
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        Ok(Box::new(InMemoryTx {
            shared: self.shared.clone(),
            claims: HashMap::new(),
            stock: HashMap::new(),
            movements: Vec::new(),
            orders: Vec::new(),
            audit: Vec::new(),
            finished: false,
        }))
    }

    async fn next_order_number(&self) -> Result<i64, StoreError> {
        self.shared
            .next_order_number
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map_err(|_| StoreError::SequenceExhausted)
    }

    async fn insert_suppliers(&self, suppliers: &[Supplier]) -> Result<(), StoreError> {
        let mut tables = self.shared.tables.write().map_err(poisoned)?;
        let mut batch = HashSet::new();
        for s in suppliers {
            if tables.suppliers.contains_key(&s.id) || !batch.insert(s.id) {
                return Err(StoreError::Constraint(format!("duplicate supplier id {}", s.id)));
            }
        }
        for s in suppliers {
            tables.suppliers.insert(s.id, s.clone());
        }
        Ok(())
    }

    async fn insert_products(&self, products: &[Product]) -> Result<(), StoreError> {
        let mut tables = self.shared.tables.write().map_err(poisoned)?;

        let mut ids = HashSet::new();
        let mut skus: HashSet<&str> = tables.products.values().map(|p| p.sku.as_str()).collect();
        for p in products {
            if !tables.suppliers.contains_key(&p.supplier_id) {
                return Err(StoreError::ForeignKey(format!(
                    "product {} references unknown supplier {}",
                    p.sku, p.supplier_id
                )));
            }
            if tables.products.contains_key(&p.id) || !ids.insert(p.id) {
                return Err(StoreError::Constraint(format!("duplicate product id {}", p.id)));
            }
            if !skus.insert(p.sku.as_str()) {
                return Err(StoreError::Constraint(format!("duplicate sku {}", p.sku)));
            }
            if p.stock < 0 {
                return Err(StoreError::Constraint(format!("negative stock for {}", p.sku)));
            }
        }
        drop(skus);

        let mut locks = self.shared.row_locks.lock().map_err(poisoned)?;
        for p in products {
            tables.products.insert(p.id, p.clone());
            locks.insert(p.id, Arc::new(AsyncMutex::new(())));
        }
        Ok(())
    }

    async fn reset(&self, order_number_restart: i64) -> Result<(), StoreError> {
        let mut tables = self.shared.tables.write().map_err(poisoned)?;
        *tables = Tables::default();
        self.shared.row_locks.lock().map_err(poisoned)?.clear();
        self.shared
            .next_order_number
            .store(order_number_restart, Ordering::SeqCst);
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl ReadStore for InMemoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read_tables()?.products.get(&id).cloned())
    }

    async fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError> {
        Ok(self.read_tables()?.suppliers.contains_key(&id))
    }

    async fn stock_levels(&self) -> Result<HashMap<ProductId, i64>, StoreError> {
        Ok(self
            .read_tables()?
            .products
            .values()
            .map(|p| (p.id, p.stock))
            .collect())
    }

    async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .read_tables()?
            .orders
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn first_order(&self) -> Result<Option<Order>, StoreError> {
        Ok(self.read_tables()?.orders.first().cloned())
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineView>, StoreError> {
        let tables = self.read_tables()?;
        let mut lines: Vec<OrderLineView> = tables
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .filter_map(|l| {
                tables.products.get(&l.product_id).map(|p| OrderLineView {
                    line: l.clone(),
                    sku: p.sku.clone(),
                    product_name: p.name.clone(),
                })
            })
            .collect();
        lines.sort_by_key(|v| v.line.line_no);
        Ok(lines)
    }

    async fn movements_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, StoreError> {
        Ok(self
            .read_tables()?
            .movements
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self.read_tables()?.audit.clone())
    }

    async fn stock_snapshot(&self) -> Result<StockSnapshot, StoreError> {
        let tables = self.read_tables()?;
        Ok(StockSnapshot {
            stock: tables.products.values().map(|p| (p.id, p.stock)).collect(),
            trail: tables.audit.clone(),
        })
    }

    async fn recent_stock_updates(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self
            .read_tables()?
            .audit
            .iter()
            .rev()
            .filter(|r| r.kind() == AuditKind::StockUpdate)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn audit_counts(&self) -> Result<BTreeMap<AuditKind, u64>, StoreError> {
        let mut counts = BTreeMap::new();
        for record in &self.read_tables()?.audit {
            *counts.entry(record.kind()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn entity_counts(&self) -> Result<EntityCounts, StoreError> {
        let tables = self.read_tables()?;
        Ok(EntityCounts {
            suppliers: tables.suppliers.len() as u64,
            products: tables.products.len() as u64,
            inventory_movements: tables.movements.len() as u64,
            orders: tables.orders.len() as u64,
            order_lines: tables.order_lines.len() as u64,
            audit_records: tables.audit.len() as u64,
        })
    }
}

/// Staged unit of work over an [`InMemoryStore`].
struct InMemoryTx {
    shared: Arc<Shared>,
    claims: HashMap<ProductId, OwnedMutexGuard<()>>,
    stock: HashMap<ProductId, i64>,
    movements: Vec<InventoryMovement>,
    orders: Vec<PricedOrder>,
    audit: Vec<AuditRecord>,
    finished: bool,
}

impl InMemoryTx {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            return Err(StoreError::backend("transaction already finished"));
        }
        Ok(())
    }

    fn discard(&mut self) {
        self.stock.clear();
        self.movements.clear();
        self.orders.clear();
        self.audit.clear();
        self.claims.clear();
    }

    fn product_exists(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.shared.tables.read().map_err(poisoned)?.products.contains_key(&id))
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn claim_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.ensure_open()?;

        if !self.claims.contains_key(&id) {
            let lock = self.shared.row_locks.lock().map_err(poisoned)?.get(&id).cloned();
            let Some(lock) = lock else {
                return Ok(None);
            };
            let guard = lock.lock_owned().await;
            self.claims.insert(id, guard);
        }

        let product = self.shared.tables.read().map_err(poisoned)?.products.get(&id).cloned();
        Ok(product.map(|mut p| {
            if let Some(staged) = self.stock.get(&id) {
                p.stock = *staged;
            }
            p
        }))
    }

    async fn write_stock(&mut self, id: ProductId, new_stock: i64) -> Result<(), StoreError> {
        self.ensure_open()?;
        if !self.claims.contains_key(&id) {
            return Err(StoreError::backend(format!(
                "stock write to unclaimed product {id}"
            )));
        }
        if new_stock < 0 {
            return Err(StoreError::Constraint(format!(
                "stock of product {id} must be non-negative"
            )));
        }
        self.stock.insert(id, new_stock);
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> Result<(), StoreError> {
        self.ensure_open()?;
        if !self.product_exists(movement.product_id)? {
            return Err(StoreError::ForeignKey(format!(
                "movement references unknown product {}",
                movement.product_id
            )));
        }
        self.movements.push(movement.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &PricedOrder) -> Result<(), StoreError> {
        self.ensure_open()?;
        {
            let tables = self.shared.tables.read().map_err(poisoned)?;
            let number = order.order.number;
            let taken = tables.orders.iter().any(|o| o.number == number)
                || self.orders.iter().any(|o| o.order.number == number);
            if taken {
                return Err(StoreError::Constraint(format!(
                    "order number {number} already used"
                )));
            }
            if let Some(line) = order
                .lines
                .iter()
                .find(|l| !tables.products.contains_key(&l.product_id))
            {
                return Err(StoreError::ForeignKey(format!(
                    "order line {} references unknown product {}",
                    line.line_no, line.product_id
                )));
            }
        }
        self.orders.push(order.clone());
        Ok(())
    }

    async fn append_audit(&mut self, record: &AuditRecord) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.audit.push(record.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.finished = true;

        if self.shared.fail_next_commit.swap(false, Ordering::SeqCst) {
            self.discard();
            return Err(StoreError::transient("connection lost during commit"));
        }

        {
            let mut tables = self.shared.tables.write().map_err(poisoned)?;
            for (id, stock) in self.stock.drain() {
                if let Some(product) = tables.products.get_mut(&id) {
                    product.stock = stock;
                }
            }
            tables.movements.append(&mut self.movements);
            for order in self.orders.drain(..) {
                tables.orders.push(order.order);
                tables.order_lines.extend(order.lines);
            }
            tables.audit.append(&mut self.audit);
        }

        // Claims go last: the next holder must see this commit's rows.
        self.claims.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.discard();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use stockguard_core::Money;
    use stockguard_products::Sku;

    async fn seeded(stock: i64) -> (InMemoryStore, Product) {
        let store = InMemoryStore::new();
        let supplier = Supplier {
            id: SupplierId::new(),
            name: "Acme".to_string(),
            contact: String::new(),
        };
        let product = Product {
            id: ProductId::new(),
            sku: Sku::parse("SKU-1").unwrap(),
            name: "Widget".to_string(),
            unit_price: Money::from_cents(250),
            stock,
            supplier_id: supplier.id,
        };
        store.insert_suppliers(&[supplier]).await.unwrap();
        store.insert_products(&[product.clone()]).await.unwrap();
        (store, product)
    }

    #[tokio::test]
    async fn staged_stock_is_invisible_until_commit() {
        let (store, product) = seeded(10).await;
        let mut tx = store.begin().await.unwrap();
        tx.claim_product(product.id).await.unwrap().unwrap();
        tx.write_stock(product.id, 4).await.unwrap();

        // The transaction sees its own write; readers do not.
        assert_eq!(tx.claim_product(product.id).await.unwrap().unwrap().stock, 4);
        assert_eq!(store.product(product.id).await.unwrap().unwrap().stock, 10);

        tx.commit().await.unwrap();
        assert_eq!(store.product(product.id).await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let (store, product) = seeded(10).await;
        let mut tx = store.begin().await.unwrap();
        tx.claim_product(product.id).await.unwrap();
        tx.write_stock(product.id, 1).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(store.product(product.id).await.unwrap().unwrap().stock, 10);
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn claims_serialize_until_the_holder_finishes() {
        let (store, product) = seeded(10).await;
        let mut first = store.begin().await.unwrap();
        first.claim_product(product.id).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), second.claim_product(product.id)).await;
        assert!(blocked.is_err(), "second claim must wait for the first");

        first.write_stock(product.id, 7).await.unwrap();
        first.commit().await.unwrap();

        let seen = second.claim_product(product.id).await.unwrap().unwrap();
        assert_eq!(seen.stock, 7);
    }

    #[tokio::test]
    async fn unknown_product_claims_nothing() {
        let (store, _) = seeded(1).await;
        let mut tx = store.begin().await.unwrap();
        assert!(tx.claim_product(ProductId::new()).await.unwrap().is_none());
        assert!(tx.write_stock(ProductId::new(), 1).await.is_err());
    }

    #[tokio::test]
    async fn injected_commit_failure_is_transient_and_discards() {
        let (store, product) = seeded(10).await;
        store.fail_next_commit();
        let mut tx = store.begin().await.unwrap();
        tx.claim_product(product.id).await.unwrap();
        tx.write_stock(product.id, 0).await.unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.product(product.id).await.unwrap().unwrap().stock, 10);

        // The claim was released.
        let mut next = store.begin().await.unwrap();
        assert!(next.claim_product(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn bulk_insert_checks_references_and_uniqueness() {
        let (store, product) = seeded(1).await;
        let orphan = Product {
            id: ProductId::new(),
            sku: Sku::parse("SKU-2").unwrap(),
            supplier_id: SupplierId::new(),
            ..product.clone()
        };
        assert!(matches!(
            store.insert_products(&[orphan]).await,
            Err(StoreError::ForeignKey(_))
        ));

        let same_sku = Product {
            id: ProductId::new(),
            ..product
        };
        assert!(matches!(
            store.insert_products(&[same_sku]).await,
            Err(StoreError::Constraint(_))
        ));
        assert_eq!(store.entity_counts().await.unwrap().products, 1);
    }

    #[tokio::test]
    async fn sequence_advances_and_exhausts() {
        let store = InMemoryStore::with_order_number_base(i64::MAX - 1);
        assert_eq!(store.next_order_number().await.unwrap(), i64::MAX - 1);
        assert_eq!(
            store.next_order_number().await.unwrap_err(),
            StoreError::SequenceExhausted
        );
    }

    #[tokio::test]
    async fn reset_clears_rows_and_restarts_sequence() {
        let (store, _) = seeded(3).await;
        store.next_order_number().await.unwrap();
        store.reset(1000).await.unwrap();
        assert_eq!(store.entity_counts().await.unwrap(), EntityCounts::default());
        assert_eq!(store.next_order_number().await.unwrap(), 1000);
    }
}
