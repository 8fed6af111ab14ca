//! Startup: wait for the store, migrate, hand back a shared handle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument, warn};

use crate::config::{Backend, StoreConfig};
use crate::error::StoreError;
use crate::store::{InMemoryStore, PostgresStore, SharedStore, Store};

/// Bounded, fixed-interval retry for the startup reachability poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl From<&StoreConfig> for RetryPolicy {
    fn from(config: &StoreConfig) -> Self {
        Self {
            attempts: config.connect_retries,
            interval: config.retry_interval,
        }
    }
}

/// Run `attempt` until it succeeds or the policy is used up.
///
/// Every failure is logged. Running out of attempts is the fatal
/// `StoreError::Unreachable`.
pub async fn wait_for_store<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<T, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = policy.attempts.max(1);
    for n in 1..=attempts {
        match attempt(n).await {
            Ok(value) => {
                if n > 1 {
                    info!(attempt = n, "store reachable");
                }
                return Ok(value);
            }
            Err(err) => {
                warn!(
                    attempt = n,
                    max_attempts = attempts,
                    error = %err,
                    "store not reachable yet"
                );
                if n < attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
        }
    }
    Err(StoreError::Unreachable { attempts })
}

/// Open the configured backend.
///
/// For Postgres this polls until a connection succeeds, then applies the
/// embedded schema.
#[instrument(skip(config), fields(host = %config.host, port = config.port), err)]
pub async fn connect(config: &StoreConfig) -> Result<SharedStore, StoreError> {
    match config.backend {
        Backend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(InMemoryStore::with_order_number_base(
                config.order_number_base,
            )))
        }
        Backend::Postgres => {
            let options = config
                .connect_options()
                .map_err(|e| StoreError::backend(e.to_string()))?;
            let max_connections = config.max_connections;
            let store = wait_for_store(RetryPolicy::from(config), move |_| {
                let options = options.clone();
                async move {
                    let pool = PgPoolOptions::new()
                        .max_connections(max_connections)
                        .acquire_timeout(Duration::from_secs(5))
                        .connect_with(options)
                        .await
                        .map_err(|e| StoreError::transient(e.to_string()))?;
                    let store = PostgresStore::new(pool);
                    store.ping().await?;
                    Ok::<_, StoreError>(store)
                }
            })
            .await?;

            store.migrate(config.order_number_base).await?;
            info!("postgres store ready");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            interval: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn succeeds_once_the_store_answers() {
        let mut calls = 0;
        let result = wait_for_store(quick(5), |n| {
            calls += 1;
            async move {
                if n < 3 {
                    Err(StoreError::transient("connection refused"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_the_configured_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = wait_for_store(quick(4), |_| {
            calls += 1;
            async { Err(StoreError::transient("connection refused")) }
        })
        .await;
        assert_eq!(result, Err(StoreError::Unreachable { attempts: 4 }));
        assert_eq!(calls, 4);
        assert!(result.unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn memory_backend_needs_no_polling() {
        let config = StoreConfig {
            backend: Backend::Memory,
            order_number_base: 7,
            ..StoreConfig::default()
        };
        let store = connect(&config).await.unwrap();
        assert_eq!(store.next_order_number().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn malformed_url_fails_before_polling() {
        let config = StoreConfig {
            database_url: Some("not a url".to_string()),
            connect_retries: 50,
            retry_interval: Duration::from_secs(60),
            ..StoreConfig::default()
        };
        let err = connect(&config).await.err();
        assert!(matches!(err, Some(StoreError::Backend(_))), "{err:?}");
    }
}
