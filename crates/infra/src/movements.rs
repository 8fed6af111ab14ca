//! Inventory Movement Processor.

use chrono::Utc;
use tracing::{info, instrument, warn, Span};

use stockguard_audit::{AuditRecord, StockUpdateCause};
use stockguard_core::{MovementId, ProductId};
use stockguard_inventory::{InventoryMovement, MovementKind, MovementRequest};

use crate::error::OperationError;
use crate::ledger::StockLedger;
use crate::store::{finish, Store, StoreTx};

/// Applies single-product inbound/outbound movements.
///
/// Each movement is one unit of work: ledger adjustment, movement row and
/// `stock_update` audit record commit together or not at all.
#[derive(Debug, Clone)]
pub struct MovementProcessor<S> {
    store: S,
}

impl<S> MovementProcessor<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(
        skip(self, note),
        fields(product_id = %product_id, kind = %kind, movement_id),
        err
    )]
    pub async fn apply_movement(
        &self,
        product_id: ProductId,
        kind: MovementKind,
        quantity: i64,
        note: &str,
    ) -> Result<InventoryMovement, OperationError> {
        let request = MovementRequest::new(product_id, kind, quantity, note);
        request.validate()?;

        let mut tx = self.store.begin().await?;
        let result = Self::apply_in(tx.as_mut(), request).await;
        match finish(tx, result).await {
            Ok(movement) => {
                Span::current().record("movement_id", tracing::field::display(movement.id));
                info!(delta = movement.delta(), "movement committed");
                Ok(movement)
            }
            Err(err) => {
                warn!(error = %err, retryable = err.is_retryable(), "movement rejected");
                Err(err)
            }
        }
    }

    async fn apply_in(
        tx: &mut dyn StoreTx,
        request: MovementRequest,
    ) -> Result<InventoryMovement, OperationError> {
        let change = StockLedger::adjust(tx, request.product_id, request.delta()).await?;

        let occurred_at = Utc::now();
        let movement = request.into_movement(MovementId::new(), occurred_at);
        tx.insert_movement(&movement).await?;
        tx.append_audit(&AuditRecord::stock_update(
            change.product_id,
            change.old_stock,
            change.new_stock,
            StockUpdateCause::Movement {
                movement_id: movement.id,
            },
            occurred_at,
        ))
        .await?;
        Ok(movement)
    }
}
