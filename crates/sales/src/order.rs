use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockguard_core::{DomainError, DomainResult, Entity, Money, OrderId, OrderLineId, ProductId};

/// Human-facing sequential order number.
///
/// Allocated independently of the order's transaction: numbers are unique and
/// increasing, but an aborted order leaves a gap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(i64);

impl OrderNumber {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Order status.
///
/// Orders are only persisted once every line has been fulfilled, so a stored
/// order is always confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "confirmed" => Ok(OrderStatus::Confirmed),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// One requested `(product, quantity)` line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl RequestedLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }
}

/// A request to create an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub customer_name: String,
    pub lines: Vec<RequestedLine>,
}

impl OrderRequest {
    pub fn new(customer_name: impl Into<String>, lines: Vec<RequestedLine>) -> Self {
        Self {
            customer_name: customer_name.into(),
            lines,
        }
    }

    /// Header-level checks. Per-line checks are done by [`RequestedLine::validate`]
    /// so callers can report the offending line number.
    pub fn validate_header(&self) -> DomainResult<()> {
        if self.customer_name.trim().is_empty() {
            return Err(DomainError::validation("customer name cannot be empty"));
        }
        if self.lines.is_empty() {
            return Err(DomainError::validation("order must have at least one line"));
        }
        Ok(())
    }
}

/// A line whose price has been read from the product row under lock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PricedLine {
    /// 1-based position in the original request.
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl PricedLine {
    pub fn subtotal(&self) -> DomainResult<Money> {
        self.unit_price.times(self.quantity)
    }
}

/// Persisted order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub number: OrderNumber,
    pub customer_name: String,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

/// Persisted order line. The unit price is the one captured at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl Entity for OrderLine {
    type Id = OrderLineId;

    fn id(&self) -> OrderLineId {
        self.id
    }
}

/// An order with its lines, totals computed and checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl PricedOrder {
    /// Compute subtotals and the exact total. Lines are kept in `line_no` order.
    pub fn build(
        order_id: OrderId,
        number: OrderNumber,
        customer_name: &str,
        mut priced: Vec<PricedLine>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if priced.is_empty() {
            return Err(DomainError::validation("order must have at least one line"));
        }
        priced.sort_by_key(|l| l.line_no);

        let mut total = Money::ZERO;
        let mut lines = Vec::with_capacity(priced.len());
        for line in priced {
            let subtotal = line.subtotal()?;
            total = total.checked_add(subtotal)?;
            lines.push(OrderLine {
                id: OrderLineId::new(),
                order_id,
                line_no: line.line_no,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal,
            });
        }

        let priced_order = Self {
            order: Order {
                id: order_id,
                number,
                customer_name: customer_name.trim().to_string(),
                total,
                status: OrderStatus::Confirmed,
                created_at,
            },
            lines,
        };
        priced_order.ensure_total_matches()?;
        Ok(priced_order)
    }

    /// `total == Σ subtotal` and `subtotal == quantity × unit_price` for every line.
    pub fn ensure_total_matches(&self) -> DomainResult<()> {
        let mut sum = Money::ZERO;
        for line in &self.lines {
            if line.order_id != self.order.id {
                return Err(DomainError::invariant("order line belongs to another order"));
            }
            if line.unit_price.times(line.quantity)? != line.subtotal {
                return Err(DomainError::invariant(format!(
                    "line {} subtotal does not equal quantity x unit price",
                    line.line_no
                )));
            }
            sum = sum.checked_add(line.subtotal)?;
        }
        if sum != self.order.total {
            return Err(DomainError::invariant(format!(
                "order total {} does not equal sum of lines {}",
                self.order.total, sum
            )));
        }
        Ok(())
    }

    pub fn receipt(&self) -> OrderReceipt {
        OrderReceipt {
            order_id: self.order.id,
            order_number: self.order.number,
            total: self.order.total,
            line_count: self.lines.len() as u32,
        }
    }
}

/// What a successful order creation hands back to the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub total: Money,
    pub line_count: u32,
}
