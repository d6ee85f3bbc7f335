//! Packet-queue seam.
//!
//! A `Disposition` is consumed by value, so each queued packet is accepted or dropped
//! exactly once.

use crate::RawPacket;

/// Verdict callback for one queued packet.
pub trait Disposition: Send {
    fn accept(self: Box<Self>);

    fn drop_packet(self: Box<Self>);
}

/// A packet awaiting its verdict.
pub struct QueuedPacket {
    pub raw: RawPacket,
    pub disposition: Box<dyn Disposition>,
}

impl QueuedPacket {
    pub fn new(raw: RawPacket, disposition: Box<dyn Disposition>) -> Self {
        Self { raw, disposition }
    }
}

/// Anything that yields queued packets until exhausted.
pub trait PacketSource: Send {
    fn next_packet(&mut self) -> Option<QueuedPacket>;
}

impl<I> PacketSource for I
where
    I: Iterator<Item = QueuedPacket> + Send,
{
    fn next_packet(&mut self) -> Option<QueuedPacket> {
        self.next()
    }
}
