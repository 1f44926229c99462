//! Notification events emitted by the receivables engine.
//!
//! The engine keeps no event log. Events here are facts handed to the caller,
//! which decides whether to publish, persist or drop them.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
