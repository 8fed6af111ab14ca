//! Stock Ledger: the only path that changes a product's stock.

use tracing::instrument;

use stockguard_core::{DomainError, ProductId};
use stockguard_inventory::StockChange;

use crate::error::OperationError;
use crate::store::StoreTx;

/// Applies signed stock deltas inside a caller-owned transaction.
///
/// The product row is claimed before it is read, so the read-check-write is
/// atomic with respect to every other adjustment of the same product. The
/// returned [`StockChange`] carries the before/after values the caller must
/// audit in the same transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct StockLedger;

impl StockLedger {
    #[instrument(skip(tx), fields(product_id = %product_id), err)]
    pub async fn adjust(
        tx: &mut dyn StoreTx,
        product_id: ProductId,
        delta: i64,
    ) -> Result<StockChange, OperationError> {
        let product = tx
            .claim_product(product_id)
            .await?
            .ok_or(DomainError::ProductNotFound(product_id))?;

        let change = StockChange::apply(product_id, product.stock, delta)?;
        tx.write_stock(product_id, change.new_stock).await?;
        Ok(change)
    }
}
