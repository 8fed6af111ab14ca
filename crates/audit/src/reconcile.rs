//! Replay `stock_update` records against the Stock Ledger.
//!
//! Records must be supplied in commit order per product. Within a product
//! that order is well-defined because stock changes to one product serialize.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use stockguard_core::{AuditId, ProductId};

use crate::record::AuditRecord;

/// A mismatch between the audit trail and the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// A record's `old_stock` does not continue from the previous `new_stock`.
    BrokenChain {
        product_id: ProductId,
        audit_id: AuditId,
        expected_old: i64,
        found_old: i64,
    },
    /// A record reports a negative stock figure.
    NegativeStock {
        product_id: ProductId,
        audit_id: AuditId,
        value: i64,
    },
    /// Replaying the trail does not land on the ledger's current stock.
    FinalMismatch {
        product_id: ProductId,
        audited: i64,
        actual: i64,
    },
    /// Records exist for a product the ledger does not know.
    UnknownProduct { product_id: ProductId },
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub products_checked: usize,
    pub records_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl ReconciliationReport {
    pub fn is_consistent(&self) -> bool {
        self.discrepancies.is_empty()
    }
}

/// Check that the `stock_update` trail explains every product's current stock.
///
/// `opening` holds stock before the first audited change. A product missing
/// from `opening` starts from its first record's `old_stock`, so only the
/// chain and the final value are checked for it. Non-stock records are ignored.
pub fn reconcile(
    opening: &HashMap<ProductId, i64>,
    current: &HashMap<ProductId, i64>,
    records: &[AuditRecord],
) -> ReconciliationReport {
    let mut report = ReconciliationReport::default();
    // BTreeMap keeps discrepancy output stable across runs.
    let mut running: BTreeMap<ProductId, i64> = BTreeMap::new();

    for record in records {
        let Some(update) = record.detail.as_stock_update() else {
            continue;
        };
        report.records_checked += 1;

        let product_id = update.product_id;
        let expected_old = running
            .get(&product_id)
            .copied()
            .or_else(|| opening.get(&product_id).copied())
            .unwrap_or(update.old_stock);

        if update.old_stock != expected_old {
            report.discrepancies.push(Discrepancy::BrokenChain {
                product_id,
                audit_id: record.id,
                expected_old,
                found_old: update.old_stock,
            });
        }
        for value in [update.old_stock, update.new_stock] {
            if value < 0 {
                report.discrepancies.push(Discrepancy::NegativeStock {
                    product_id,
                    audit_id: record.id,
                    value,
                });
            }
        }
        running.insert(product_id, update.new_stock);
    }

    for (product_id, audited) in &running {
        match current.get(product_id) {
            Some(actual) if actual != audited => {
                report.discrepancies.push(Discrepancy::FinalMismatch {
                    product_id: *product_id,
                    audited: *audited,
                    actual: *actual,
                });
            }
            Some(_) => {}
            None => report.discrepancies.push(Discrepancy::UnknownProduct {
                product_id: *product_id,
            }),
        }
    }

    // Untouched products must still sit at their opening stock.
    let mut untouched: Vec<_> = current
        .iter()
        .filter(|(id, _)| !running.contains_key(id))
        .collect();
    untouched.sort_by_key(|(id, _)| **id);
    for (product_id, actual) in untouched {
        if let Some(opening_stock) = opening.get(product_id) {
            if opening_stock != actual {
                report.discrepancies.push(Discrepancy::FinalMismatch {
                    product_id: *product_id,
                    audited: *opening_stock,
                    actual: *actual,
                });
            }
        }
    }

    report.products_checked = current.len();
    report
}
