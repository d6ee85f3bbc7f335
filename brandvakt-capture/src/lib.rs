//! brandvakt‑capture
//!
//! Transport seam between the packet queue and the decision engine: raw frames in,
//! exactly one disposition out. Ships an IPv4 header decoder and a seeded traffic
//! generator; kernel queue bindings plug in as further `PacketSource`s.

pub mod decode;
pub mod packet;
pub mod queue;
pub mod simulate;

use thiserror::Error;

pub use decode::{decode_ipv4, encode_ipv4};
pub use packet::RawPacket;
pub use queue::{Disposition, PacketSource, QueuedPacket};
pub use simulate::{SimulatedSource, SimulationTally};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Packet shorter than its IPv4 header")]
    Truncated,

    #[error("Unsupported IP version {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid IPv4 header length ({0} words)")]
    BadHeaderLength(u8),
}
