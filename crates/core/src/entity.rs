//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Orders and their shipping lines are entities: two orders with the same
/// requested quantity are still different orders.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
