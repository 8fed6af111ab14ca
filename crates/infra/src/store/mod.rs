//! Transactional storage boundary.
//!
//! Services talk to storage only through [`Store`] (begin a unit of work, draw
//! order numbers, bulk seed, reset) and [`StoreTx`] (claim rows and write
//! inside one atomic unit). [`ReadStore`] serves the read-only reports.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{EntityCounts, OrderLineView, ReadStore, StockSnapshot, Store, StoreTx};

use std::sync::Arc;

use tracing::warn;

use crate::error::OperationError;

/// A backend that serves both the transactional and the read-only side.
pub trait CommerceStore: Store + ReadStore {}

impl<T> CommerceStore for T where T: Store + ReadStore + ?Sized {}

/// Type-erased handle used when the backend is picked at runtime.
pub type SharedStore = Arc<dyn CommerceStore>;

/// End a unit of work: commit on success, roll back on failure.
///
/// A failed commit has already discarded the transaction; its error is
/// returned as-is so the caller can tell a retryable failure apart.
pub async fn finish<T>(
    mut tx: Box<dyn StoreTx>,
    result: Result<T, OperationError>,
) -> Result<T, OperationError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed; transaction discarded on drop");
            }
            Err(err)
        }
    }
}
