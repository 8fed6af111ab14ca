//! Infrastructure error model.
//!
//! `StoreError` covers the storage boundary. `OperationError` is what the
//! transactional services (ledger, movements, fulfillment, sequence) return:
//! either a deterministic domain rejection or a storage failure.

use thiserror::Error;

use stockguard_core::DomainError;

/// Storage-layer failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connectivity loss, pool timeout, serialization failure or deadlock.
    /// The unit of work was rolled back and may be retried by the caller.
    #[error("transient store failure: {0}")]
    Transient(String),

    /// Unique or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A referenced row does not exist.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// The order number sequence cannot advance any further.
    #[error("order number sequence exhausted")]
    SequenceExhausted,

    /// The store never became reachable during startup.
    #[error("store unreachable after {attempts} attempts")]
    Unreachable { attempts: u32 },

    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }

    /// Failures the process cannot continue past.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::SequenceExhausted | StoreError::Unreachable { .. }
        )
    }
}

/// Failure of a transactional operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    /// The request itself was rejected (validation, stock rules, unknown ids).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// One order line could not be fulfilled; the whole order was rolled back.
    #[error("order line {line_no} rejected: {source}")]
    LineRejected {
        line_no: u32,
        #[source]
        source: DomainError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OperationError {
    /// Attribute a domain rejection to an order line. Storage errors pass through.
    pub fn at_line(self, line_no: u32) -> Self {
        match self {
            OperationError::Domain(source) => OperationError::LineRejected { line_no, source },
            other => other,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationError::Store(e) if e.is_retryable())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, OperationError::Store(e) if e.is_fatal())
    }

    /// The underlying domain rejection, if this is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            OperationError::Domain(e) => Some(e),
            OperationError::LineRejected { source, .. } => Some(source),
            OperationError::Store(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockguard_core::ProductId;

    #[test]
    fn at_line_wraps_domain_errors_only() {
        let id = ProductId::new();
        let err = OperationError::from(DomainError::insufficient_stock(id, 0, 2)).at_line(3);
        assert!(matches!(err, OperationError::LineRejected { line_no: 3, .. }));
        assert_eq!(err.domain().and_then(DomainError::product_id), Some(id));

        let store = OperationError::from(StoreError::transient("reset by peer")).at_line(1);
        assert!(matches!(store, OperationError::Store(_)));
        assert!(store.is_retryable());
        assert!(store.domain().is_none());
    }

    #[test]
    fn fatal_errors_are_not_retryable() {
        for err in [
            StoreError::SequenceExhausted,
            StoreError::Unreachable { attempts: 12 },
        ] {
            let op = OperationError::from(err);
            assert!(op.is_fatal());
            assert!(!op.is_retryable());
        }
        assert!(!OperationError::from(DomainError::validation("x")).is_fatal());
    }
}
