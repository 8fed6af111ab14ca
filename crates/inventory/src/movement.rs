//! Inventory movements: single-product inbound/outbound deltas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockguard_core::{DomainError, DomainResult, Entity, MovementId, ProductId};

/// Direction of a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Goods received; stock goes up.
    In,
    /// Goods issued; stock goes down.
    Out,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
        }
    }

    /// Signed stock delta for `quantity` units in this direction.
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementKind::In => quantity,
            MovementKind::Out => -quantity,
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" => Ok(MovementKind::In),
            "out" => Ok(MovementKind::Out),
            other => Err(DomainError::validation(format!(
                "movement kind must be 'in' or 'out', got '{other}'"
            ))),
        }
    }
}

/// A requested movement, not yet applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub note: String,
}

impl MovementRequest {
    pub fn new(
        product_id: ProductId,
        kind: MovementKind,
        quantity: i64,
        note: impl Into<String>,
    ) -> Self {
        Self {
            product_id,
            kind,
            quantity,
            note: note.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(())
    }

    /// Signed delta to hand to the Stock Ledger.
    pub fn delta(&self) -> i64 {
        self.kind.signed(self.quantity)
    }

    /// Materialize the movement row once the ledger accepted the delta.
    pub fn into_movement(self, id: MovementId, occurred_at: DateTime<Utc>) -> InventoryMovement {
        InventoryMovement {
            id,
            product_id: self.product_id,
            kind: self.kind,
            quantity: self.quantity,
            note: self.note,
            occurred_at,
        }
    }
}

/// One applied stock delta. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub quantity: i64,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

impl Entity for InventoryMovement {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.id
    }
}

impl InventoryMovement {
    pub fn delta(&self) -> i64 {
        self.kind.signed(self.quantity)
    }
}
