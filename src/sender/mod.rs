//! Delivery Contract
//!
//! A [`Sender`] ships `raw_event` payloads to one destination. Backends:
//! - **file**: newline-delimited append with size-triggered rotation
//! - **syslog**: RFC 3164 / RFC 5424 lines over TCP or UDP
//! - **hec**: buffered, batched HTTP POST of newline-delimited JSON envelopes
//!
//! All backends guard their mutable state behind one `Mutex` per instance, so
//! a sender can be shared across threads. Nothing retries: a failed call is
//! returned to the caller, who decides what to do next.

pub mod file;
pub mod hec;
pub mod syslog;

use crate::config::{DestinationConfig, Protocol};
use crate::error::DeliveryError;
use crate::event::GeneratedEvent;
use tracing::info;

pub use file::FileSender;
pub use hec::HecSender;
pub use syslog::SyslogSender;

pub trait Sender: Send + Sync {
    /// Destination label for logs.
    fn name(&self) -> &str;

    /// Transmit one event (or buffer it, for batching backends).
    fn send(&self, event: &GeneratedEvent) -> Result<(), DeliveryError>;

    /// Push anything buffered to the destination.
    fn flush(&self) -> Result<(), DeliveryError> {
        Ok(())
    }

    /// Lightweight connectivity or write check, independent of `send`.
    fn test(&self) -> Result<(), DeliveryError>;

    /// Flush and release the underlying handle. Call once.
    fn close(&self) -> Result<(), DeliveryError>;
}

/// Build the sender selected by `config.protocol`. Each backend validates
/// the config before touching the network or filesystem.
pub fn connect(config: &DestinationConfig) -> Result<Box<dyn Sender>, DeliveryError> {
    let sender: Box<dyn Sender> = match config.protocol {
        Protocol::File => Box::new(FileSender::new(config)?),
        Protocol::SyslogTcp | Protocol::SyslogUdp => Box::new(SyslogSender::new(config)?),
        Protocol::Hec => Box::new(HecSender::new(config)?),
    };
    info!(destination = %config.name, protocol = %config.protocol, "Sender ready");
    Ok(sender)
}

/// Lock a sender's state, mapping poisoning to a delivery error.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, DeliveryError> {
    mutex.lock().map_err(|_| DeliveryError::Poisoned)
}
