use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockguard_core::{AuditId, Entity, Money, MovementId, OrderId, ProductId};

/// Operation type of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    StockUpdate,
    OrderCreated,
}

impl AuditKind {
    /// Stable operation name as stored in the log (e.g. `"stock_update"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::StockUpdate => "stock_update",
            AuditKind::OrderCreated => "order_created",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stock_update" => Some(AuditKind::StockUpdate),
            "order_created" => Some(AuditKind::OrderCreated),
            _ => None,
        }
    }
}

impl core::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What caused a stock update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum StockUpdateCause {
    Movement { movement_id: MovementId },
    Order { order_id: OrderId, line_no: u32 },
}

/// Payload of a `stock_update` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdateDetail {
    pub product_id: ProductId,
    pub old_stock: i64,
    pub new_stock: i64,
    pub cause: StockUpdateCause,
}

impl StockUpdateDetail {
    pub fn delta(&self) -> i64 {
        self.new_stock - self.old_stock
    }
}

/// Payload of an `order_created` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedDetail {
    pub order_id: OrderId,
    pub order_number: i64,
    pub line_count: u32,
    pub total: Money,
}

/// Typed, per-operation audit payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation_type", content = "details", rename_all = "snake_case")]
pub enum AuditDetail {
    StockUpdate(StockUpdateDetail),
    OrderCreated(OrderCreatedDetail),
}

/// Failure to rebuild a typed record from its stored form.
#[derive(Debug, Error)]
pub enum AuditDecodeError {
    #[error("unknown audit operation type: {0}")]
    UnknownKind(String),
    #[error("malformed {kind} details: {source}")]
    Payload {
        kind: AuditKind,
        #[source]
        source: serde_json::Error,
    },
}

impl AuditDetail {
    pub fn kind(&self) -> AuditKind {
        match self {
            AuditDetail::StockUpdate(_) => AuditKind::StockUpdate,
            AuditDetail::OrderCreated(_) => AuditKind::OrderCreated,
        }
    }

    /// Split into the stored `(operation_type, details)` columns.
    pub fn to_parts(&self) -> Result<(AuditKind, JsonValue), serde_json::Error> {
        let details = match self {
            AuditDetail::StockUpdate(d) => serde_json::to_value(d)?,
            AuditDetail::OrderCreated(d) => serde_json::to_value(d)?,
        };
        Ok((self.kind(), details))
    }

    /// Rebuild from the stored `(operation_type, details)` columns.
    pub fn from_parts(operation_type: &str, details: JsonValue) -> Result<Self, AuditDecodeError> {
        let kind = AuditKind::parse(operation_type)
            .ok_or_else(|| AuditDecodeError::UnknownKind(operation_type.to_string()))?;
        let payload_err = |source| AuditDecodeError::Payload { kind, source };
        match kind {
            AuditKind::StockUpdate => serde_json::from_value(details)
                .map(AuditDetail::StockUpdate)
                .map_err(payload_err),
            AuditKind::OrderCreated => serde_json::from_value(details)
                .map(AuditDetail::OrderCreated)
                .map_err(payload_err),
        }
    }

    pub fn as_stock_update(&self) -> Option<&StockUpdateDetail> {
        match self {
            AuditDetail::StockUpdate(d) => Some(d),
            AuditDetail::OrderCreated(_) => None,
        }
    }
}

/// One append-only audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditId,
    pub occurred_at: DateTime<Utc>,
    pub detail: AuditDetail,
}

impl Entity for AuditRecord {
    type Id = AuditId;

    fn id(&self) -> AuditId {
        self.id
    }
}

impl AuditRecord {
    pub fn new(detail: AuditDetail, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: AuditId::new(),
            occurred_at,
            detail,
        }
    }

    pub fn stock_update(
        product_id: ProductId,
        old_stock: i64,
        new_stock: i64,
        cause: StockUpdateCause,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            AuditDetail::StockUpdate(StockUpdateDetail {
                product_id,
                old_stock,
                new_stock,
                cause,
            }),
            occurred_at,
        )
    }

    pub fn order_created(
        order_id: OrderId,
        order_number: i64,
        line_count: u32,
        total: Money,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            AuditDetail::OrderCreated(OrderCreatedDetail {
                order_id,
                order_number,
                line_count,
                total,
            }),
            occurred_at,
        )
    }

    pub fn kind(&self) -> AuditKind {
        self.detail.kind()
    }

    /// Whether this record was produced by the given order (either kind).
    pub fn belongs_to_order(&self, order_id: OrderId) -> bool {
        match &self.detail {
            AuditDetail::StockUpdate(d) => {
                matches!(d.cause, StockUpdateCause::Order { order_id: o, .. } if o == order_id)
            }
            AuditDetail::OrderCreated(d) => d.order_id == order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_parts_rebuild_the_same_detail() {
        let record = AuditRecord::stock_update(
            ProductId::new(),
            10,
            4,
            StockUpdateCause::Movement {
                movement_id: MovementId::new(),
            },
            Utc::now(),
        );
        let (kind, details) = record.detail.to_parts().unwrap();
        assert_eq!(kind.as_str(), "stock_update");
        assert_eq!(details["old_stock"], 10);
        assert_eq!(details["new_stock"], 4);
        assert_eq!(details["cause"]["source"], "movement");

        let back = AuditDetail::from_parts(kind.as_str(), details).unwrap();
        assert_eq!(back, record.detail);
    }

    #[test]
    fn unknown_operation_type_is_rejected() {
        let err = AuditDetail::from_parts("price_change", serde_json::json!({})).unwrap_err();
        assert!(matches!(err, AuditDecodeError::UnknownKind(k) if k == "price_change"));
    }

    #[test]
    fn malformed_details_are_rejected() {
        let err = AuditDetail::from_parts("order_created", serde_json::json!({"order_id": 1}))
            .unwrap_err();
        assert!(matches!(
            err,
            AuditDecodeError::Payload {
                kind: AuditKind::OrderCreated,
                ..
            }
        ));
    }

    #[test]
    fn belongs_to_order_matches_both_kinds() {
        let order_id = OrderId::new();
        let other = OrderId::new();
        let line = AuditRecord::stock_update(
            ProductId::new(),
            5,
            3,
            StockUpdateCause::Order {
                order_id,
                line_no: 1,
            },
            Utc::now(),
        );
        let created =
            AuditRecord::order_created(order_id, 1000, 1, Money::from_cents(100), Utc::now());
        assert!(line.belongs_to_order(order_id));
        assert!(created.belongs_to_order(order_id));
        assert!(!line.belongs_to_order(other));
    }
}
