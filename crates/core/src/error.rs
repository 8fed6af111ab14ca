//! Domain error model.

use thiserror::Error;

use crate::id::{ProductId, SupplierId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, stock rules, referential integrity). Storage concerns belong
/// to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Applying the requested delta would drive stock below zero.
    ///
    /// Expected and recoverable: callers may lower the quantity or skip the line.
    #[error(
        "insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// A referenced product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A referenced supplier does not exist.
    #[error("supplier not found: {0}")]
    SupplierNotFound(SupplierId),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn insufficient_stock(product_id: ProductId, available: i64, requested: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            available,
            requested,
        }
    }

    /// The product this error is about, if any.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            DomainError::InsufficientStock { product_id, .. } => Some(*product_id),
            DomainError::ProductNotFound(id) => Some(*id),
            _ => None,
        }
    }
}
