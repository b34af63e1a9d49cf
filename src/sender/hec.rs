//! HTTP Event Collector Sender
//!
//! Buffers one JSON envelope per event and POSTs the buffer as a
//! newline-delimited JSON body once it reaches `batch_size`:
//!
//! ```text
//! POST <url>
//! Authorization: Splunk <token>
//! Content-Type: application/json
//!
//! {"time":1714564800.123456,"host":"h","source":"threatgen","sourcetype":"suricata","event":"{...}"}
//! {"time":1714564800.223456,"host":"h","source":"threatgen","sourcetype":"suricata","event":"{...}"}
//! ```
//!
//! The buffer lives behind a `Mutex` so append-and-maybe-flush is a single
//! critical section. A failed flush leaves the buffer intact for the next try.

use super::{Sender, lock};
use crate::config::DestinationConfig;
use crate::error::DeliveryError;
use crate::event::GeneratedEvent;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SOURCE: &str = "threatgen";

/// One buffered event as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HecEnvelope {
    pub time: f64,
    pub host: String,
    pub source: String,
    pub sourcetype: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub index: Option<String>,
    pub event: String,
}

/// Error body returned by the collector, e.g. `{"text":"Invalid token","code":4}`.
#[derive(Debug, Deserialize)]
struct HecResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

pub struct HecSender {
    name: String,
    client: Client,
    url: String,
    token: String,
    host: String,
    source: String,
    sourcetype: Option<String>,
    index: Option<String>,
    batch_size: usize,
    buffer: Mutex<Vec<HecEnvelope>>,
}

impl HecSender {
    pub fn new(config: &DestinationConfig) -> Result<Self, DeliveryError> {
        config.validate()?;
        let url = config
            .url
            .clone()
            .ok_or_else(|| DeliveryError::Config("hec destination requires `url`".into()))?;
        let token = config
            .token
            .clone()
            .ok_or_else(|| DeliveryError::Config("hec destination requires `token`".into()))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()?;

        if !config.tls_verify {
            warn!(url = %url, "TLS certificate verification disabled");
        }
        info!(url = %url, batch_size = config.batch_size, index = ?config.index, "HEC sender ready");

        Ok(Self {
            name: config.name.clone(),
            client,
            url,
            token,
            host: config.resolved_hostname(),
            source: config
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            sourcetype: config.sourcetype.clone(),
            index: config.index.clone(),
            batch_size: config.batch_size,
            buffer: Mutex::new(Vec::new()),
        })
    }

    /// Wrap an event in its HEC envelope.
    pub fn envelope(&self, event: &GeneratedEvent) -> HecEnvelope {
        HecEnvelope {
            time: event.epoch_seconds(),
            host: self.host.clone(),
            source: self.source.clone(),
            sourcetype: self
                .sourcetype
                .clone()
                .unwrap_or_else(|| event.sourcetype().to_string()),
            index: self.index.clone(),
            event: event.raw_event().to_string(),
        }
    }

    /// Envelopes waiting for the next flush.
    pub fn pending(&self) -> Result<usize, DeliveryError> {
        Ok(lock(&self.buffer)?.len())
    }

    fn post(&self, body: String) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .header(AUTHORIZATION, format!("Splunk {}", self.token))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = diagnostic(status, &response.text().unwrap_or_default());
        warn!(url = %self.url, status = status.as_u16(), message = %message, "HEC request rejected");
        if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
            return Err(DeliveryError::Unauthorized {
                status: status.as_u16(),
                message,
            });
        }
        Err(DeliveryError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    fn flush_locked(&self, buffer: &mut Vec<HecEnvelope>) -> Result<(), DeliveryError> {
        if buffer.is_empty() {
            return Ok(());
        }
        let body = encode_batch(buffer)?;
        self.post(body)?;
        debug!(url = %self.url, count = buffer.len(), "HEC batch flushed");
        buffer.clear();
        Ok(())
    }
}

impl Sender for HecSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: &GeneratedEvent) -> Result<(), DeliveryError> {
        let envelope = self.envelope(event);
        let mut buffer = lock(&self.buffer)?;
        buffer.push(envelope);
        if self.batch_size == 0 || buffer.len() >= self.batch_size {
            self.flush_locked(&mut buffer)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), DeliveryError> {
        let mut buffer = lock(&self.buffer)?;
        self.flush_locked(&mut buffer)
    }

    fn test(&self) -> Result<(), DeliveryError> {
        let check = HecEnvelope {
            time: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            host: self.host.clone(),
            source: self.source.clone(),
            sourcetype: self
                .sourcetype
                .clone()
                .unwrap_or_else(|| "threatgen:test".to_string()),
            index: self.index.clone(),
            event: "threatgen connectivity test".to_string(),
        };
        self.post(serde_json::to_string(&check)?)?;
        info!(url = %self.url, "HEC connectivity test passed");
        Ok(())
    }

    fn close(&self) -> Result<(), DeliveryError> {
        self.flush()?;
        info!(url = %self.url, "HEC sender closed");
        Ok(())
    }
}

/// One envelope per line.
pub fn encode_batch(envelopes: &[HecEnvelope]) -> Result<String, DeliveryError> {
    let mut body = String::new();
    for envelope in envelopes {
        body.push_str(&serde_json::to_string(envelope)?);
        body.push('\n');
    }
    Ok(body)
}

fn diagnostic(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<HecResponse>(body) {
        Ok(HecResponse {
            text: Some(text),
            code,
        }) => match code {
            Some(code) => format!("{text} (code {code})"),
            None => text,
        },
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status.canonical_reason().unwrap_or("unknown error").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Fields;

    fn sender(batch_size: usize) -> HecSender {
        let mut config = DestinationConfig::hec("http://127.0.0.1:9/services/collector", "tok");
        config.batch_size = batch_size;
        config.hostname = Some("gen-01".into());
        config.index = Some("security".into());
        HecSender::new(&config).unwrap()
    }

    fn event() -> GeneratedEvent {
        GeneratedEvent::new(
            "suricata",
            "2009582",
            Utc::now(),
            r#"{"alert":{"signature":"ET SCAN"}}"#.to_string(),
            Fields::new(),
            "suricata",
        )
    }

    #[test]
    fn test_envelope_shape() {
        let sender = sender(10);
        let event = event();
        let envelope = sender.envelope(&event);
        assert_eq!(envelope.host, "gen-01");
        assert_eq!(envelope.source, DEFAULT_SOURCE);
        assert_eq!(envelope.sourcetype, "suricata");
        assert_eq!(envelope.index.as_deref(), Some("security"));
        assert_eq!(envelope.event, event.raw_event());
        assert!((envelope.time - event.epoch_seconds()).abs() < 1e-6);
    }

    #[test]
    fn test_sourcetype_override() {
        let mut config = DestinationConfig::hec("http://127.0.0.1:9/", "tok");
        config.sourcetype = Some("custom:st".into());
        let sender = HecSender::new(&config).unwrap();
        assert_eq!(sender.envelope(&event()).sourcetype, "custom:st");
    }

    #[test]
    fn test_index_omitted_when_unset() {
        let envelope = HecEnvelope {
            time: 1.5,
            host: "h".into(),
            source: "s".into(),
            sourcetype: "st".into(),
            index: None,
            event: "e".into(),
        };
        let line = serde_json::to_string(&envelope).unwrap();
        assert!(!line.contains("index"));
    }

    #[test]
    fn test_encode_batch_is_ndjson() {
        let sender = sender(10);
        let batch = vec![sender.envelope(&event()), sender.envelope(&event())];
        let body = encode_batch(&batch).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: HecEnvelope = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.sourcetype, "suricata");
        }
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_buffers_below_batch_size() {
        let sender = sender(3);
        sender.send(&event()).unwrap();
        sender.send(&event()).unwrap();
        assert_eq!(sender.pending().unwrap(), 2);
    }

    #[test]
    fn test_huge_batch_size_does_not_preallocate() {
        let mut config = DestinationConfig::hec("http://127.0.0.1:9/", "tok");
        config.batch_size = usize::MAX / 2;
        assert!(config.validate().is_ok());

        let sender = HecSender::new(&config).unwrap();
        sender.send(&event()).unwrap();
        assert_eq!(sender.pending().unwrap(), 1);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let sender = sender(3);
        sender.flush().unwrap();
        sender.close().unwrap();
    }

    #[test]
    fn test_diagnostic_parsing() {
        assert_eq!(
            diagnostic(StatusCode::BAD_REQUEST, r#"{"text":"No data","code":5}"#),
            "No data (code 5)"
        );
        assert_eq!(diagnostic(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(diagnostic(StatusCode::SERVICE_UNAVAILABLE, ""), "Service Unavailable");
    }
}
