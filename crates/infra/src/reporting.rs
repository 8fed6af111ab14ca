//! Read-only verification report.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::instrument;

use stockguard_audit::{reconcile, AuditKind, AuditRecord, ReconciliationReport};
use stockguard_sales::Order;

use crate::error::StoreError;
use crate::store::{EntityCounts, OrderLineView, ReadStore};

/// How much of each listing to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLimits {
    pub recent_orders: usize,
    pub recent_stock_updates: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            recent_orders: 5,
            recent_stock_updates: 10,
        }
    }
}

/// Snapshot of the store used to eyeball and verify a run.
#[derive(Debug, Clone, Serialize)]
pub struct CommerceReport {
    /// Newest first.
    pub recent_orders: Vec<Order>,
    /// The oldest order with its lines.
    pub first_order: Option<(Order, Vec<OrderLineView>)>,
    /// Newest first.
    pub recent_stock_updates: Vec<AuditRecord>,
    pub audit_counts: BTreeMap<AuditKind, u64>,
    pub counts: EntityCounts,
    pub reconciliation: ReconciliationReport,
}

#[instrument(skip(store), err)]
pub async fn collect_report<R>(
    store: &R,
    limits: ReportLimits,
) -> Result<CommerceReport, StoreError>
where
    R: ReadStore + ?Sized,
{
    let recent_orders = store.recent_orders(limits.recent_orders).await?;
    let first_order = match store.first_order().await? {
        Some(order) => {
            let lines = store.order_lines(order.id).await?;
            Some((order, lines))
        }
        None => None,
    };

    Ok(CommerceReport {
        recent_orders,
        first_order,
        recent_stock_updates: store.recent_stock_updates(limits.recent_stock_updates).await?,
        audit_counts: store.audit_counts().await?,
        counts: store.entity_counts().await?,
        reconciliation: reconcile_store(store).await?,
    })
}

/// Replay the stored audit trail against current stock.
///
/// Opening stock is not recorded (bulk loading bypasses the log), so each
/// product's chain starts at its first record.
pub async fn reconcile_store<R>(store: &R) -> Result<ReconciliationReport, StoreError>
where
    R: ReadStore + ?Sized,
{
    let snapshot = store.stock_snapshot().await?;
    Ok(reconcile(&HashMap::new(), &snapshot.stock, &snapshot.trail))
}
