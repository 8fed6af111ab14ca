//! Order Fulfillment Engine.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{info, instrument, warn, Span};

use stockguard_audit::{AuditRecord, StockUpdateCause};
use stockguard_core::{DomainError, Money, OrderId, ProductId};
use stockguard_sales::{
    OrderNumber, OrderReceipt, OrderRequest, PricedLine, PricedOrder, RequestedLine,
};

use crate::error::OperationError;
use crate::ledger::StockLedger;
use crate::sequence::SequenceAllocator;
use crate::store::{finish, Store, StoreTx};

/// Creates multi-line orders atomically.
///
/// Either every line is fulfilled (stock decremented, order and lines stored,
/// audit records written) or nothing is. Product rows are claimed in
/// ascending id order so two orders over overlapping products cannot
/// deadlock.
#[derive(Debug)]
pub struct FulfillmentEngine<S> {
    store: S,
    sequence: SequenceAllocator<S>,
}

impl<S> FulfillmentEngine<S>
where
    S: Store + Clone,
{
    pub fn new(store: S) -> Self {
        Self {
            sequence: SequenceAllocator::new(store.clone()),
            store,
        }
    }
}

impl<S> FulfillmentEngine<S>
where
    S: Store,
{
    pub fn sequence(&self) -> &SequenceAllocator<S> {
        &self.sequence
    }

    #[instrument(
        skip(self, customer_name, lines),
        fields(line_count = lines.len(), order_number, order_id),
        err
    )]
    pub async fn create_order(
        &self,
        customer_name: &str,
        lines: &[RequestedLine],
    ) -> Result<OrderReceipt, OperationError> {
        let request = OrderRequest::new(customer_name, lines.to_vec());
        request.validate_header()?;
        for (line_no, line) in numbered(&request.lines) {
            line.validate()
                .map_err(|e| OperationError::from(e).at_line(line_no))?;
        }

        // Outside the transaction: an aborted order burns its number.
        let number = self.sequence.next_order_number().await?;
        let span = Span::current();
        span.record("order_number", number.value());

        let mut tx = self.store.begin().await?;
        let result = Self::fulfil(tx.as_mut(), &request, number).await;
        match finish(tx, result).await {
            Ok(order) => {
                span.record("order_id", tracing::field::display(order.order.id));
                info!(total = %order.order.total, "order committed");
                Ok(order.receipt())
            }
            Err(err) => {
                warn!(error = %err, retryable = err.is_retryable(), "order rolled back");
                Err(err)
            }
        }
    }

    async fn fulfil(
        tx: &mut dyn StoreTx,
        request: &OrderRequest,
        number: OrderNumber,
    ) -> Result<PricedOrder, OperationError> {
        let order_id = OrderId::new();
        let now = Utc::now();

        // First line that mentions each product, for error attribution.
        let mut first_line: BTreeMap<ProductId, u32> = BTreeMap::new();
        for (line_no, line) in numbered(&request.lines) {
            first_line.entry(line.product_id).or_insert(line_no);
        }

        // Claim every product up front in id order; prices are read under the claim.
        let claim_order: BTreeSet<ProductId> = first_line.keys().copied().collect();
        let mut prices: BTreeMap<ProductId, Money> = BTreeMap::new();
        for product_id in claim_order {
            match tx.claim_product(product_id).await? {
                Some(product) => {
                    prices.insert(product_id, product.unit_price);
                }
                None => {
                    let line_no = first_line.get(&product_id).copied().unwrap_or(1);
                    return Err(OperationError::LineRejected {
                        line_no,
                        source: DomainError::ProductNotFound(product_id),
                    });
                }
            }
        }

        let mut priced = Vec::with_capacity(request.lines.len());
        let mut stock_updates = Vec::with_capacity(request.lines.len());
        for (line_no, line) in numbered(&request.lines) {
            let change = StockLedger::adjust(tx, line.product_id, -line.quantity)
                .await
                .map_err(|e| e.at_line(line_no))?;
            let unit_price = prices
                .get(&line.product_id)
                .copied()
                .ok_or_else(|| DomainError::invariant("price missing for claimed product"))?;

            priced.push(PricedLine {
                line_no,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
            });
            stock_updates.push(AuditRecord::stock_update(
                change.product_id,
                change.old_stock,
                change.new_stock,
                StockUpdateCause::Order { order_id, line_no },
                now,
            ));
        }

        let order = PricedOrder::build(order_id, number, &request.customer_name, priced, now)?;
        tx.insert_order(&order).await?;
        for record in &stock_updates {
            tx.append_audit(record).await?;
        }
        tx.append_audit(&AuditRecord::order_created(
            order_id,
            number.value(),
            order.lines.len() as u32,
            order.order.total,
            now,
        ))
        .await?;
        Ok(order)
    }
}

/// Lines paired with their 1-based line numbers.
fn numbered(lines: &[RequestedLine]) -> impl Iterator<Item = (u32, &RequestedLine)> {
    lines.iter().enumerate().map(|(idx, line)| (idx as u32 + 1, line))
}
