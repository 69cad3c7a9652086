//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Storage ports and the audit decorator are generic over this trait, so an
/// entity type only needs a strongly-typed identifier to participate.
/// Identifiers are small `Copy`-able values (UUIDs or tuples of them), so
/// `id` returns by value; composite natural keys need no backing field.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
