//! Error types for generation, delivery and the custom template store.
//!
//! Every failure propagates to the immediate caller as a typed value:
//! - **GenerateError**: unknown event type / template, serialization failures
//! - **DeliveryError**: bad destination config, transport and HTTP failures
//! - **StoreError**: custom template lookups and validation

use thiserror::Error;

/// Failures raised while resolving a generator or building an event.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("unknown event type: {0}")]
    UnknownType(String),

    #[error("unknown template `{template}` for event type `{event_type}`")]
    UnknownTemplate {
        event_type: String,
        template: String,
    },

    #[error("failed to serialize {event_type} event: {reason}")]
    Serialization { event_type: String, reason: String },
}

impl GenerateError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownType(_) | Self::UnknownTemplate { .. }
        )
    }
}

/// Failures raised by sender construction, `send`, `flush`, `test` and `close`.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid destination config: {0}")]
    Config(String),

    #[error("I/O error on {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect to {addr}: {reason}")]
    Connect { addr: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HEC rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("HEC authorization failed (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("sender state poisoned by a panicked writer")]
    Poisoned,
}

impl DeliveryError {
    pub(crate) fn io(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            target: target.into(),
            source,
        }
    }
}

/// Failures from the in-memory custom template store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("custom template not found: {0}")]
    NotFound(String),

    #[error("invalid custom template: {0}")]
    Invalid(String),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("template store lock poisoned")]
    Poisoned,
}
