//! Event Model
//!
//! Shared value types flowing from generators to senders. A `GeneratedEvent`
//! is immutable once built: `raw_event` is the wire payload and is always the
//! generator's own serialization of `fields`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Structured field map used as a generator's working representation.
pub type Fields = Map<String, Value>;

/// Serialization format a generator emits into `raw_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventFormat {
    Json,
    Xml,
}

impl std::fmt::Display for EventFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventFormat::Json => write!(f, "json"),
            EventFormat::Xml => write!(f, "xml"),
        }
    }
}

/// Static descriptor of one generator family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub event_ids: Vec<String>,
}

/// Static descriptor of one template a generator can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTemplate {
    pub id: String,
    pub name: String,
    pub category: String,
    pub event_id: String,
    pub format: EventFormat,
    pub description: String,
}

impl EventTemplate {
    pub fn new(
        id: &str,
        name: &str,
        category: &str,
        event_id: &str,
        format: EventFormat,
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            event_id: event_id.to_string(),
            format,
            description: description.to_string(),
        }
    }

    /// Whether `key` names this template, by template id or event id.
    pub fn matches(&self, key: &str) -> bool {
        self.id == key || self.event_id == key
    }
}

/// One synthetic event, ready for preview or delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEvent {
    id: Uuid,
    #[serde(rename = "type")]
    event_type: String,
    event_id: String,
    timestamp: DateTime<Utc>,
    raw_event: String,
    fields: Fields,
    sourcetype: String,
}

impl GeneratedEvent {
    /// Build an event stamped with a fresh id and the given UTC timestamp.
    pub fn new(
        event_type: impl Into<String>,
        event_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        raw_event: String,
        fields: Fields,
        sourcetype: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            event_id: event_id.into(),
            timestamp,
            raw_event,
            fields,
            sourcetype: sourcetype.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The serialized wire payload, transmitted verbatim by senders.
    pub fn raw_event(&self) -> &str {
        &self.raw_event
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn sourcetype(&self) -> &str {
        &self.sourcetype
    }

    /// Unix seconds with a microsecond fraction, as used by HEC envelopes.
    pub fn epoch_seconds(&self) -> f64 {
        self.timestamp.timestamp() as f64
            + f64::from(self.timestamp.timestamp_subsec_micros()) / 1_000_000.0
    }
}
