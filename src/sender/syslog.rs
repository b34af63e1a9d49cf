//! Syslog sender over a raw TCP stream or UDP datagram socket.
//!
//! Wire formats:
//! - **RFC 3164** (default): `<PRI>Mmm dd HH:MM:SS host tag: payload`
//! - **RFC 5424**: `<PRI>1 2024-05-01T12:00:00.000000Z host tag - - - payload`
//!
//! TCP messages are newline-terminated; UDP sends one datagram per event.
//! The socket is connected once at construction and never reconnected.

use super::{Sender, lock};
use crate::config::{DEFAULT_SYSLOG_PORT, DestinationConfig, Protocol, SyslogFormat};
use crate::error::DeliveryError;
use crate::event::GeneratedEvent;
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const TEST_WRITE_TIMEOUT: Duration = Duration::from_secs(5);
/// debug
const TEST_SEVERITY: u8 = 7;

enum Transport {
    Tcp(TcpStream),
    Udp(UdpSocket),
}

impl Transport {
    fn is_stream(&self) -> bool {
        matches!(self, Transport::Tcp(_))
    }

    fn write_message(&mut self, message: &[u8]) -> std::io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.write_all(message),
            Transport::Udp(socket) => socket.send(message).map(|_| ()),
        }
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.set_write_timeout(timeout),
            Transport::Udp(socket) => socket.set_write_timeout(timeout),
        }
    }

    #[cfg(test)]
    fn write_timeout(&self) -> std::io::Result<Option<Duration>> {
        match self {
            Transport::Tcp(stream) => stream.write_timeout(),
            Transport::Udp(socket) => socket.write_timeout(),
        }
    }

    fn shutdown(&self) -> std::io::Result<()> {
        match self {
            Transport::Tcp(stream) => match stream.shutdown(std::net::Shutdown::Both) {
                Err(e) if e.kind() != std::io::ErrorKind::NotConnected => Err(e),
                _ => Ok(()),
            },
            Transport::Udp(_) => Ok(()),
        }
    }
}

/// Header settings shared by every message of one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyslogHeader {
    pub facility: u8,
    pub severity: u8,
    pub format: SyslogFormat,
    pub hostname: String,
    pub tag: String,
}

impl SyslogHeader {
    pub fn from_config(config: &DestinationConfig) -> Self {
        Self {
            facility: config.facility(),
            severity: config.severity(),
            format: config.syslog_format,
            hostname: config.resolved_hostname(),
            tag: config.app_name.clone(),
        }
    }

    pub fn priority(&self) -> u16 {
        priority(self.facility, self.severity)
    }

    /// Render one message without transport framing.
    pub fn format(&self, severity: u8, timestamp: DateTime<Utc>, payload: &str) -> String {
        let pri = priority(self.facility, severity);
        match self.format {
            SyslogFormat::Rfc3164 => format!(
                "<{pri}>{} {} {}: {payload}",
                timestamp.format("%b %e %H:%M:%S"),
                self.hostname,
                self.tag,
            ),
            SyslogFormat::Rfc5424 => format!(
                "<{pri}>1 {} {} {} - - - {payload}",
                timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                self.hostname,
                self.tag,
            ),
        }
    }
}

pub fn priority(facility: u8, severity: u8) -> u16 {
    u16::from(facility) * 8 + u16::from(severity)
}

pub struct SyslogSender {
    name: String,
    addr: SocketAddr,
    header: SyslogHeader,
    transport: Mutex<Transport>,
}

impl SyslogSender {
    pub fn new(config: &DestinationConfig) -> Result<Self, DeliveryError> {
        config.validate()?;
        let host = config
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| DeliveryError::Config("syslog destination requires `host`".into()))?;
        let port = config.port.unwrap_or(DEFAULT_SYSLOG_PORT);
        let target = format!("{host}:{port}");

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| DeliveryError::Connect {
                addr: target.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| DeliveryError::Connect {
                addr: target.clone(),
                reason: "hostname resolved to no addresses".into(),
            })?;

        let connect_err = |e: std::io::Error| DeliveryError::Connect {
            addr: target.clone(),
            reason: e.to_string(),
        };

        let transport = match config.protocol {
            Protocol::SyslogTcp => {
                let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).map_err(connect_err)?;
                stream.set_nodelay(true).map_err(connect_err)?;
                Transport::Tcp(stream)
            }
            Protocol::SyslogUdp => {
                let local: SocketAddr = if addr.is_ipv4() {
                    ([0, 0, 0, 0], 0).into()
                } else {
                    (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local).map_err(connect_err)?;
                socket.connect(addr).map_err(connect_err)?;
                Transport::Udp(socket)
            }
            other => {
                return Err(DeliveryError::Config(format!(
                    "syslog sender cannot serve protocol {other}"
                )));
            }
        };

        let header = SyslogHeader::from_config(config);
        info!(
            addr = %addr,
            protocol = %config.protocol,
            priority = header.priority(),
            format = ?header.format,
            "Syslog sender connected"
        );

        Ok(Self {
            name: config.name.clone(),
            addr,
            header,
            transport: Mutex::new(transport),
        })
    }

    pub fn header(&self) -> &SyslogHeader {
        &self.header
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    fn write(&self, transport: &mut Transport, mut message: String) -> Result<(), DeliveryError> {
        if transport.is_stream() {
            message.push('\n');
        }
        transport.write_message(message.as_bytes()).map_err(|e| {
            warn!(addr = %self.addr, error = %e, "Syslog write failed");
            DeliveryError::io(self.addr.to_string(), e)
        })
    }
}

impl Sender for SyslogSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: &GeneratedEvent) -> Result<(), DeliveryError> {
        let message = self
            .header
            .format(self.header.severity, Utc::now(), event.raw_event());
        let mut transport = lock(&self.transport)?;
        self.write(&mut transport, message)?;
        debug!(addr = %self.addr, id = %event.id(), "Syslog message sent");
        Ok(())
    }

    fn test(&self) -> Result<(), DeliveryError> {
        let message = self.header.format(
            TEST_SEVERITY,
            Utc::now(),
            "threatgen connectivity test",
        );
        let mut transport = lock(&self.transport)?;
        let io_err = |e| DeliveryError::io(self.addr.to_string(), e);

        transport
            .set_write_timeout(Some(TEST_WRITE_TIMEOUT))
            .map_err(io_err)?;
        let written = self.write(&mut transport, message);
        let cleared = transport.set_write_timeout(None).map_err(io_err);
        written.and(cleared)
    }

    fn close(&self) -> Result<(), DeliveryError> {
        let transport = lock(&self.transport)?;
        transport
            .shutdown()
            .map_err(|e| DeliveryError::io(self.addr.to_string(), e))?;
        info!(addr = %self.addr, "Syslog sender closed");
        Ok(())
    }
}
