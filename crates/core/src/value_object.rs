//! Value object trait: equality by value, not identity.
//!
//! A pack size of 500 is the same pack size wherever it appears; a pack
//! assignment is defined entirely by its `size -> count` entries.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// struct PackSize(u64);
///
/// impl ValueObject for PackSize {}
///
/// assert_eq!(PackSize(500), PackSize(500));
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
