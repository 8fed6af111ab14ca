//! Inventory domain module.
//!
//! Stock Ledger arithmetic and inventory movements, implemented purely as
//! deterministic domain logic (no IO, no storage). The transactional wrapper
//! that claims product rows lives in `stockguard-infra`.

pub mod ledger;
pub mod movement;

pub use ledger::StockChange;
pub use movement::{InventoryMovement, MovementKind, MovementRequest};
