//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Suppliers, products, movements, orders and audit records are entities:
/// two rows with the same id are the same thing even if other fields differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
