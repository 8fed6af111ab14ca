//! Monetary amounts.
//!
//! Prices and totals use exact decimal arithmetic so that an order total is
//! always the exact sum of its line subtotals.

use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Number of fractional digits carried by every amount.
pub const MONEY_SCALE: u32 = 2;

/// Non-negative monetary amount with two decimal places.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build an amount, rejecting negatives and values with more than two decimals.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::validation(format!(
                "amount cannot be negative: {amount}"
            )));
        }
        let normalized = amount.normalize();
        if normalized.scale() > MONEY_SCALE {
            return Err(DomainError::validation(format!(
                "amount has more than {MONEY_SCALE} decimal places: {amount}"
            )));
        }
        let mut value = amount;
        value.rescale(MONEY_SCALE);
        Ok(Self(value))
    }

    /// Build an amount from an integer count of cents.
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from_i128_with_scale(i128::from(cents), MONEY_SCALE))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// `self × quantity`, exact. Fails on overflow or non-positive quantity.
    pub fn times(&self, quantity: i64) -> DomainResult<Money> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let product = self
            .0
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| DomainError::validation("line amount overflow"))?;
        Ok(Money(product))
    }

    pub fn checked_add(&self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    /// Panics on overflow; use [`Money::checked_add`] on untrusted input.
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
