//! Value object trait: equality by value, not identity.

/// Marker trait for immutable, value-compared domain objects.
///
/// `Amount { value: 100, currency: "USD" }` is a value object: two amounts
/// with the same value and currency are interchangeable. A `Transaction` is
/// not - it has identity that survives state changes.
///
/// To "modify" a value object, construct a new one. This keeps values safe
/// to share across request tasks.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
