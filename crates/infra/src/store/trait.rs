use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use stockguard_audit::{AuditKind, AuditRecord};
use stockguard_core::{OrderId, ProductId, SupplierId};
use stockguard_inventory::InventoryMovement;
use stockguard_parties::Supplier;
use stockguard_products::{Product, Sku};
use stockguard_sales::{Order, OrderLine, PricedOrder};

use crate::error::StoreError;

/// One atomic unit of work.
///
/// Everything written through a `StoreTx` becomes visible together on
/// [`commit`](StoreTx::commit) or not at all. Dropping a transaction without
/// committing discards it. Product rows claimed with
/// [`claim_product`](StoreTx::claim_product) stay claimed until the
/// transaction ends, so concurrent units touching the same product serialize.
#[async_trait]
pub trait StoreTx: Send {
    /// Claim a product row for the rest of the transaction and return its
    /// current state (including stock already written by this transaction).
    ///
    /// Claiming a product this transaction already holds returns immediately.
    async fn claim_product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Overwrite the stock of a product claimed by this transaction.
    async fn write_stock(&mut self, id: ProductId, new_stock: i64) -> Result<(), StoreError>;

    async fn insert_movement(&mut self, movement: &InventoryMovement) -> Result<(), StoreError>;

    /// Insert the order header and all of its lines.
    async fn insert_order(&mut self, order: &PricedOrder) -> Result<(), StoreError>;

    /// Append to the audit log. Records become visible in append order.
    async fn append_audit(&mut self, record: &AuditRecord) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Writable storage boundary.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    /// Draw the next raw value of the durable order number sequence.
    ///
    /// Not part of any transaction: a drawn value is consumed even if the
    /// order that asked for it is rolled back.
    async fn next_order_number(&self) -> Result<i64, StoreError>;

    /// Bulk insert used by seeding. Bypasses the ledger and the audit log.
    async fn insert_suppliers(&self, suppliers: &[Supplier]) -> Result<(), StoreError>;

    /// Bulk insert used by seeding. Opening stock is taken as-is.
    async fn insert_products(&self, products: &[Product]) -> Result<(), StoreError>;

    /// Delete all rows and restart the order sequence at `order_number_restart`.
    async fn reset(&self, order_number_restart: i64) -> Result<(), StoreError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Row counts across all tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub suppliers: u64,
    pub products: u64,
    pub inventory_movements: u64,
    pub orders: u64,
    pub order_lines: u64,
    pub audit_records: u64,
}

/// An order line joined with its product's SKU and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
    pub line: OrderLine,
    pub sku: Sku,
    pub product_name: String,
}

/// Stock levels and the audit trail as of one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    pub stock: HashMap<ProductId, i64>,
    pub trail: Vec<AuditRecord>,
}

/// Read-only queries. These never claim rows and see committed data only.
#[async_trait]
pub trait ReadStore: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError>;

    /// Current stock of every product.
    async fn stock_levels(&self) -> Result<HashMap<ProductId, i64>, StoreError>;

    /// Newest first.
    async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>, StoreError>;

    /// The oldest order, if any.
    async fn first_order(&self) -> Result<Option<Order>, StoreError>;

    /// Lines of one order, by line number.
    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineView>, StoreError>;

    /// Movements applied to a product, oldest first.
    async fn movements_for(&self, product_id: ProductId)
    -> Result<Vec<InventoryMovement>, StoreError>;

    /// The whole audit log in commit order.
    async fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError>;

    /// Stock and audit trail read together, so no commit lands between them.
    async fn stock_snapshot(&self) -> Result<StockSnapshot, StoreError>;

    /// Newest `stock_update` records first.
    async fn recent_stock_updates(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError>;

    async fn audit_counts(&self) -> Result<BTreeMap<AuditKind, u64>, StoreError>;

    async fn entity_counts(&self) -> Result<EntityCounts, StoreError>;
}

#[async_trait]
impl<S> Store for Arc<S>
where
    S: Store + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        (**self).begin().await
    }

    async fn next_order_number(&self) -> Result<i64, StoreError> {
        (**self).next_order_number().await
    }

    async fn insert_suppliers(&self, suppliers: &[Supplier]) -> Result<(), StoreError> {
        (**self).insert_suppliers(suppliers).await
    }

    async fn insert_products(&self, products: &[Product]) -> Result<(), StoreError> {
        (**self).insert_products(products).await
    }

    async fn reset(&self, order_number_restart: i64) -> Result<(), StoreError> {
        (**self).reset(order_number_restart).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }
}

#[async_trait]
impl<S> ReadStore for Arc<S>
where
    S: ReadStore + ?Sized,
{
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).product(id).await
    }

    async fn supplier_exists(&self, id: SupplierId) -> Result<bool, StoreError> {
        (**self).supplier_exists(id).await
    }

    async fn stock_levels(&self) -> Result<HashMap<ProductId, i64>, StoreError> {
        (**self).stock_levels().await
    }

    async fn recent_orders(&self, limit: usize) -> Result<Vec<Order>, StoreError> {
        (**self).recent_orders(limit).await
    }

    async fn first_order(&self) -> Result<Option<Order>, StoreError> {
        (**self).first_order().await
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLineView>, StoreError> {
        (**self).order_lines(order_id).await
    }

    async fn movements_for(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>, StoreError> {
        (**self).movements_for(product_id).await
    }

    async fn audit_trail(&self) -> Result<Vec<AuditRecord>, StoreError> {
        (**self).audit_trail().await
    }

    async fn stock_snapshot(&self) -> Result<StockSnapshot, StoreError> {
        (**self).stock_snapshot().await
    }

    async fn recent_stock_updates(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        (**self).recent_stock_updates(limit).await
    }

    async fn audit_counts(&self) -> Result<BTreeMap<AuditKind, u64>, StoreError> {
        (**self).audit_counts().await
    }

    async fn entity_counts(&self) -> Result<EntityCounts, StoreError> {
        (**self).entity_counts().await
    }
}
