use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::Event;

/// Envelope for an event, carrying routing metadata for notification or
/// automation consumers.
///
/// - `subject_id` is the entity the event is about (e.g. the invoice).
/// - `subject_type` names the entity kind (e.g. "invoicing.invoice").
/// - `payload` is the event itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    event_type: String,
    event_version: u32,

    subject_id: Uuid,
    subject_type: String,

    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Wrap an event, copying its type/version/time into the envelope header.
    pub fn wrap(event_id: Uuid, subject_id: Uuid, subject_type: impl Into<String>, payload: E) -> Self {
        Self {
            event_id,
            event_type: payload.event_type().to_string(),
            event_version: payload.version(),
            subject_id,
            subject_type: subject_type.into(),
            occurred_at: payload.occurred_at(),
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn subject_id(&self) -> Uuid {
        self.subject_id
    }

    pub fn subject_type(&self) -> &str {
        &self.subject_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
