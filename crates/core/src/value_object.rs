//! Value objects: compared by value, never by identity.

/// Marker trait for immutable domain values (amounts, SKUs, stock changes).
///
/// Two value objects holding the same attributes are interchangeable. To
/// "change" one, build a new value; nothing mutates in place.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
