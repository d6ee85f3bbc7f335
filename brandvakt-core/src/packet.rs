//! Normalized packet view handed to the decision pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// IP protocol carried by a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Icmp,
    Tcp,
    Udp,
    Other(u8),
}

impl Protocol {
    /// Maps an IANA protocol number onto a `Protocol`.
    pub fn from_number(number: u8) -> Self {
        match number {
            1 => Protocol::Icmp,
            6 => Protocol::Tcp,
            17 => Protocol::Udp,
            n => Protocol::Other(n),
        }
    }

    /// IANA protocol number.
    pub fn number(self) -> u8 {
        match self {
            Protocol::Icmp => 1,
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Other(n) => n,
        }
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            Protocol::Icmp => Some("ICMP"),
            Protocol::Tcp => Some("TCP"),
            Protocol::Udp => Some("UDP"),
            Protocol::Other(_) => None,
        }
    }

    /// Whether a rule's protocol field selects this protocol.
    ///
    /// Accepts the protocol name (case-insensitive) or its decimal number.
    pub fn matches_spec(self, spec: &str) -> bool {
        let spec = spec.trim();
        if let Ok(number) = spec.parse::<u8>() {
            return number == self.number();
        }
        self.name()
            .is_some_and(|name| name.eq_ignore_ascii_case(spec))
    }

    /// Whether the protocol carries 16-bit source/destination ports.
    pub fn has_ports(self) -> bool {
        matches!(self, Protocol::Tcp | Protocol::Udp)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.number()),
        }
    }
}

/// Read-only view of one packet, built once by the transport adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketInfo {
    pub source_ip: String,
    pub dest_ip: String,
    pub protocol: Protocol,
    /// Transport source port (TCP/UDP only)
    pub source_port: Option<u16>,
    /// Transport destination port (TCP/UDP only)
    pub dest_port: Option<u16>,
    pub timestamp: DateTime<Utc>,
}

impl PacketInfo {
    /// Creates a packet view stamped with the current wall-clock time.
    #[inline]
    pub fn new(source_ip: impl Into<String>, dest_ip: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            source_ip: source_ip.into(),
            dest_ip: dest_ip.into(),
            protocol,
            source_port: None,
            dest_port: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_ports(mut self, source_port: u16, dest_port: u16) -> Self {
        self.source_port = Some(source_port);
        self.dest_port = Some(dest_port);
        self
    }

    pub fn with_dest_port(mut self, dest_port: u16) -> Self {
        self.dest_port = Some(dest_port);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

impl fmt::Display for PacketInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.protocol)?;
        match self.source_port {
            Some(port) => write!(f, "{}:{}", self.source_ip, port)?,
            None => f.write_str(&self.source_ip)?,
        }
        f.write_str(" -> ")?;
        match self.dest_port {
            Some(port) => write!(f, "{}:{}", self.dest_ip, port),
            None => f.write_str(&self.dest_ip),
        }
    }
}
