//! threatgen - Synthetic Security Telemetry
//!
//! Generates realistic-looking security events and ships them to SIEM-style
//! destinations.
//!
//! - [`generator`]: per-family generators behind a shared [`Registry`]
//! - [`store`]: in-memory custom templates layered over builtin ones
//! - [`sender`]: file, syslog and HEC delivery backends
//!
//! ```no_run
//! use threatgen::{DestinationConfig, Fields, registry, sender};
//!
//! let event = registry::global().generate("suricata", "et-scan-nmap", &Fields::new())?;
//! let out = sender::connect(&DestinationConfig::file("/var/log/threatgen/eve.json"))?;
//! out.send(&event)?;
//! out.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod generator;
pub mod sender;
pub mod store;

pub use config::{DestinationConfig, Protocol, SyslogFormat};
pub use error::{DeliveryError, GenerateError, StoreError};
pub use event::{EventFormat, EventTemplate, EventType, Fields, GeneratedEvent};
pub use generator::{Generator, Registry, merge_overrides, registry};
pub use sender::Sender;
pub use store::{CustomTemplate, TemplateDraft, TemplateStore};
