//! Destination Configuration
//!
//! A `DestinationConfig` selects a protocol and carries every knob the
//! senders read. It is built once (from JSON or in code), validated by the
//! sender constructor and never mutated afterwards.
//!
//! ```json
//! {
//!   "name": "splunk-lab",
//!   "protocol": "hec",
//!   "url": "https://splunk.lab:8088/services/collector/event",
//!   "token": "00000000-0000-0000-0000-000000000000",
//!   "index": "security",
//!   "batch_size": 50,
//!   "tls_verify": false
//! }
//! ```

use crate::error::DeliveryError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_MAX_SIZE_MB: u64 = 100;
pub const DEFAULT_ROTATE_KEEP: usize = 5;
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_SYSLOG_PORT: u16 = 514;
/// user-level messages
pub const DEFAULT_FACILITY: u8 = 1;
/// informational
pub const DEFAULT_SEVERITY: u8 = 6;
pub const DEFAULT_APP_NAME: &str = "threatgen";

/// Output protocol of a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    File,
    SyslogTcp,
    SyslogUdp,
    Hec,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Protocol::File => write!(f, "file"),
            Protocol::SyslogTcp => write!(f, "syslog-tcp"),
            Protocol::SyslogUdp => write!(f, "syslog-udp"),
            Protocol::Hec => write!(f, "hec"),
        }
    }
}

impl std::str::FromStr for Protocol {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Protocol::File),
            "syslog-tcp" | "tcp" => Ok(Protocol::SyslogTcp),
            "syslog-udp" | "udp" => Ok(Protocol::SyslogUdp),
            "hec" | "splunk" => Ok(Protocol::Hec),
            other => Err(DeliveryError::Config(format!("unknown protocol: {other}"))),
        }
    }
}

/// Syslog wire format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyslogFormat {
    #[default]
    Rfc3164,
    Rfc5424,
}

/// Configuration bag consumed by sender constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
    /// Label used in logs
    pub name: String,
    pub protocol: Protocol,

    // --- file ---
    pub path: Option<PathBuf>,
    /// Rotate once the active file reaches this size; 0 disables rotation
    pub max_size_mb: u64,
    /// Number of rotated siblings kept (`path.1` .. `path.N`)
    pub rotate_keep: usize,

    // --- syslog ---
    pub host: Option<String>,
    pub port: Option<u16>,
    pub facility: Option<u8>,
    pub severity: Option<u8>,
    pub syslog_format: SyslogFormat,
    /// Syslog tag / APP-NAME
    pub app_name: String,

    // --- hec ---
    pub url: Option<String>,
    pub token: Option<String>,
    pub index: Option<String>,
    pub source: Option<String>,
    /// Replaces each event's own sourcetype when set
    pub sourcetype: Option<String>,
    /// Envelopes buffered before a flush; 0 flushes every event
    pub batch_size: usize,
    pub tls_verify: bool,

    /// Hostname written into syslog headers and HEC envelopes
    pub hostname: Option<String>,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            protocol: Protocol::File,
            path: None,
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            rotate_keep: DEFAULT_ROTATE_KEEP,
            host: None,
            port: None,
            facility: None,
            severity: None,
            syslog_format: SyslogFormat::default(),
            app_name: DEFAULT_APP_NAME.to_string(),
            url: None,
            token: None,
            index: None,
            source: None,
            sourcetype: None,
            batch_size: DEFAULT_BATCH_SIZE,
            tls_verify: true,
            hostname: None,
        }
    }
}

impl DestinationConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            protocol: Protocol::File,
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn syslog(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: Some(host.into()),
            port: Some(port),
            ..Default::default()
        }
    }

    pub fn hec(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            protocol: Protocol::Hec,
            url: Some(url.into()),
            token: Some(token.into()),
            ..Default::default()
        }
    }

    /// Load a JSON destination file.
    pub fn from_path(path: &Path) -> Result<Self, DeliveryError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DeliveryError::io(path.display().to_string(), e))?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            DeliveryError::Config(format!("{}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the selected protocol cannot run with.
    pub fn validate(&self) -> Result<(), DeliveryError> {
        match self.protocol {
            Protocol::File => {
                if self.path.as_ref().is_none_or(|p| p.as_os_str().is_empty()) {
                    return Err(DeliveryError::Config("file destination requires `path`".into()));
                }
            }
            Protocol::SyslogTcp | Protocol::SyslogUdp => {
                if self.host.as_deref().is_none_or(str::is_empty) {
                    return Err(DeliveryError::Config("syslog destination requires `host`".into()));
                }
                if self.port == Some(0) {
                    return Err(DeliveryError::Config("syslog port must be non-zero".into()));
                }
                if self.facility.is_some_and(|f| f > 23) {
                    return Err(DeliveryError::Config("syslog facility must be 0..=23".into()));
                }
                if self.severity.is_some_and(|s| s > 7) {
                    return Err(DeliveryError::Config("syslog severity must be 0..=7".into()));
                }
            }
            Protocol::Hec => {
                let url = self
                    .url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| DeliveryError::Config("hec destination requires `url`".into()))?;
                reqwest::Url::parse(url)
                    .map_err(|e| DeliveryError::Config(format!("invalid hec url `{url}`: {e}")))?;
                if self.token.as_deref().is_none_or(str::is_empty) {
                    return Err(DeliveryError::Config("hec destination requires `token`".into()));
                }
            }
        }
        Ok(())
    }

    pub fn facility(&self) -> u8 {
        self.facility.unwrap_or(DEFAULT_FACILITY)
    }

    pub fn severity(&self) -> u8 {
        self.severity.unwrap_or(DEFAULT_SEVERITY)
    }

    /// Configured hostname, else the local machine's.
    pub fn resolved_hostname(&self) -> String {
        self.hostname
            .clone()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(local_hostname)
    }
}

/// Local hostname from `THREATGEN_HOSTNAME`, `HOSTNAME`, then `gethostname(2)`.
pub fn local_hostname() -> String {
    for var in ["THREATGEN_HOSTNAME", "HOSTNAME"] {
        if let Ok(name) = std::env::var(var) {
            if !name.trim().is_empty() {
                return name.trim().to_string();
            }
        }
    }
    system_hostname().unwrap_or_else(|| {
        warn!("Could not determine hostname, using 'localhost'");
        "localhost".to_string()
    })
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(name) => name
            .to_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Err(e) => {
            warn!(error = %e, "Failed to get system hostname");
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}
