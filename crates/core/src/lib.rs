//! `receivables-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! errors, identifiers, money and the reference-date clock abstraction shared by
//! the aging and risk engines.

pub mod clock;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use clock::{Clock, FixedClock, ReferenceDate, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, InvoiceId};
pub use money::Money;
pub use value_object::ValueObject;
