//! Stock Ledger arithmetic.

use serde::{Deserialize, Serialize};

use stockguard_core::{DomainError, DomainResult, ProductId, ValueObject};

/// The outcome of one applied stock delta: what the ledger held before and after.
///
/// Every committed `StockChange` must be mirrored by exactly one audit record
/// carrying the same `old_stock`/`new_stock`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub product_id: ProductId,
    pub old_stock: i64,
    pub new_stock: i64,
}

impl ValueObject for StockChange {}

impl StockChange {
    /// Apply `delta` to `current` stock.
    ///
    /// Rejects a zero delta, arithmetic overflow, and any result below zero.
    /// A negative `current` is a corrupted ledger row and is reported as an
    /// invariant violation rather than silently carried forward.
    pub fn apply(product_id: ProductId, current: i64, delta: i64) -> DomainResult<Self> {
        if current < 0 {
            return Err(DomainError::invariant(format!(
                "product {product_id} has negative stock {current}"
            )));
        }
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_stock = current
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock adjustment overflow"))?;
        if new_stock < 0 {
            return Err(DomainError::insufficient_stock(
                product_id,
                current,
                delta.saturating_neg(),
            ));
        }
        Ok(Self {
            product_id,
            old_stock: current,
            new_stock,
        })
    }

    pub fn delta(&self) -> i64 {
        self.new_stock - self.old_stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn withdrawal_within_stock_succeeds() {
        let id = ProductId::new();
        let change = StockChange::apply(id, 10, -6).unwrap();
        assert_eq!(change.old_stock, 10);
        assert_eq!(change.new_stock, 4);
        assert_eq!(change.delta(), -6);
    }

    #[test]
    fn withdrawal_beyond_stock_is_insufficient() {
        let id = ProductId::new();
        let err = StockChange::apply(id, 10, -15).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(id, 10, 15));
    }

    #[test]
    fn withdrawing_everything_leaves_zero() {
        let change = StockChange::apply(ProductId::new(), 3, -3).unwrap();
        assert_eq!(change.new_stock, 0);
    }

    #[test]
    fn zero_delta_is_rejected() {
        assert!(matches!(
            StockChange::apply(ProductId::new(), 5, 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn overflow_is_rejected() {
        assert!(StockChange::apply(ProductId::new(), i64::MAX, 1).is_err());
    }

    #[test]
    fn negative_current_stock_is_an_invariant_violation() {
        assert!(matches!(
            StockChange::apply(ProductId::new(), -1, 5),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of deltas, applying only the accepted
        /// ones never drives stock below zero, and each accepted change chains
        /// from the previous one.
        #[test]
        fn stock_never_goes_negative(
            start in 0i64..1_000,
            deltas in prop::collection::vec(-50i64..50i64, 1..100)
        ) {
            let id = ProductId::new();
            let mut stock = start;
            for delta in deltas {
                match StockChange::apply(id, stock, delta) {
                    Ok(change) => {
                        prop_assert_eq!(change.old_stock, stock);
                        prop_assert_eq!(change.delta(), delta);
                        prop_assert!(change.new_stock >= 0);
                        stock = change.new_stock;
                    }
                    Err(DomainError::InsufficientStock { available, requested, .. }) => {
                        prop_assert_eq!(available, stock);
                        prop_assert!(requested > stock);
                    }
                    Err(DomainError::Validation(_)) => prop_assert_eq!(delta, 0),
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
            }
            prop_assert!(stock >= 0);
        }
    }
}
