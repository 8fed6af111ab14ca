//! `stockguard-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, and the shared error model.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AuditId, MovementId, OrderId, OrderLineId, ProductId, SupplierId};
pub use money::{Money, MONEY_SCALE};
pub use value_object::ValueObject;
