//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**. They are defined entirely by their
//! attribute values, so two value objects with the same values are equal.

/// Marker trait for value objects.
///
/// - **Value Object**: `Money`, `RiskLevel`, an aging bucket definition
/// - **Entity**: an invoice or a customer (has an id)
///
/// Value objects are immutable: to "modify" one, construct a new one. They are
/// cheap to clone and safe to share across threads.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
