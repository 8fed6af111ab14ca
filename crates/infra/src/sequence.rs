//! Order number allocation.

use tokio::sync::Mutex;
use tracing::{error, instrument};

use stockguard_sales::OrderNumber;

use crate::error::StoreError;
use crate::store::Store;

/// Hands out order numbers from the store's durable sequence.
///
/// Allocation is independent of any transaction: a number drawn for an order
/// that later rolls back is simply never used. Numbers issued by one allocator
/// are strictly increasing; anything else means the sequence was exhausted or
/// rewound underneath a running process, and is fatal.
#[derive(Debug)]
pub struct SequenceAllocator<S> {
    store: S,
    last_issued: Mutex<Option<i64>>,
}

impl<S> SequenceAllocator<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            last_issued: Mutex::new(None),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn next_order_number(&self) -> Result<OrderNumber, StoreError> {
        // Held across the draw so "issued later" implies "drawn later".
        let mut last = self.last_issued.lock().await;
        let value = self.store.next_order_number().await?;
        if let Some(previous) = *last {
            if value <= previous {
                error!(previous, value, "order number sequence went backwards");
                return Err(StoreError::SequenceExhausted);
            }
        }
        *last = Some(value);
        Ok(OrderNumber::new(value))
    }

    pub async fn last_issued(&self) -> Option<OrderNumber> {
        self.last_issued.lock().await.map(OrderNumber::new)
    }
}
