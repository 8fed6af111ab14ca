//! Audit Log model.
//!
//! Audit records are **immutable** facts written in the same atomic unit as
//! the mutation they describe, and are **append-only**: nothing in this
//! workspace updates or deletes one. Reconciliation replays them against the
//! Stock Ledger.

pub mod reconcile;
pub mod record;

pub use reconcile::{reconcile, Discrepancy, ReconciliationReport};
pub use record::{
    AuditDecodeError, AuditDetail, AuditKind, AuditRecord, OrderCreatedDetail, StockUpdateCause,
    StockUpdateDetail,
};
