//! Wipe all data and restart order numbering.

use tracing::{instrument, warn};

use crate::error::StoreError;
use crate::store::Store;

/// Truncate every table and restart the order sequence at `restart_at`
/// (normally the configured base, 1000 by default).
#[instrument(skip(store), err)]
pub async fn reset_all<S>(store: &S, restart_at: i64) -> Result<(), StoreError>
where
    S: Store + ?Sized,
{
    warn!("deleting all suppliers, products, movements, orders and audit records");
    store.reset(restart_at).await
}
