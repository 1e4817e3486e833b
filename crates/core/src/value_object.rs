//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two stock keys
/// naming the same item at the same location are the same key, regardless of
/// where they were built.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
