//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. In this
/// workspace they carry the classification-sensitive scalars (hashed emails,
/// audit metadata values) whose constructors enforce what may be stored.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct EmailHash(String);
///
/// impl ValueObject for EmailHash {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
