//! Seeded synthetic traffic.
//!
//! Internal hosts in `192.168.1.0/24` talk to servers in `10.0.0.0/27` on a handful of
//! service ports; a configurable share of packets comes from a hostile pool instead.
//! Identical seeds produce identical streams.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use brandvakt_core::Protocol;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::decode::encode_ipv4;
use crate::{Disposition, PacketSource, QueuedPacket, RawPacket};

const SERVICE_PORTS: [u16; 5] = [22, 53, 80, 443, 8080];

/// Dispositions recorded by simulated packets.
#[derive(Debug, Default)]
pub struct SimulationTally {
    accepted: AtomicU64,
    dropped: AtomicU64,
}

impl SimulationTally {
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.accepted() + self.dropped()
    }
}

struct TallyDisposition(Arc<SimulationTally>);

impl Disposition for TallyDisposition {
    fn accept(self: Box<Self>) {
        self.0.accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn drop_packet(self: Box<Self>) {
        self.0.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct SimulatedSource {
    rng: StdRng,
    remaining: usize,
    hostile_ratio: f64,
    hostile_pool: Vec<Ipv4Addr>,
    clock: DateTime<Utc>,
    tally: Arc<SimulationTally>,
}

impl SimulatedSource {
    /// `hostile_ratio` is clamped to `[0, 1]`.
    pub fn new(packets: usize, seed: u64, hostile_ratio: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            remaining: packets,
            hostile_ratio: hostile_ratio.clamp(0.0, 1.0),
            hostile_pool: (1..=16).map(|host| Ipv4Addr::new(203, 0, 113, host)).collect(),
            clock: Utc::now(),
            tally: Arc::new(SimulationTally::default()),
        }
    }

    /// Replaces the default `203.0.113.1-16` hostile pool. An empty pool is ignored.
    pub fn with_hostile_pool(mut self, pool: Vec<Ipv4Addr>) -> Self {
        if !pool.is_empty() {
            self.hostile_pool = pool;
        }
        self
    }

    /// Timestamp of the first packet; later packets are 1 ms apart.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.clock = start;
        self
    }

    pub fn tally(&self) -> Arc<SimulationTally> {
        Arc::clone(&self.tally)
    }

    fn next_frame(&mut self) -> RawPacket {
        let hostile = self.rng.random_bool(self.hostile_ratio);
        let dest = Ipv4Addr::new(10, 0, 0, self.rng.random_range(1..=30));

        let (source, protocol, dest_port) = if hostile {
            let source = self.hostile_pool[self.rng.random_range(0..self.hostile_pool.len())];
            (source, Protocol::Tcp, self.rng.random_range(1..=1024))
        } else {
            let source = Ipv4Addr::new(192, 168, 1, self.rng.random_range(1..=254));
            let protocol = match self.rng.random_range(0..100) {
                0..=69 => Protocol::Tcp,
                70..=94 => Protocol::Udp,
                _ => Protocol::Icmp,
            };
            let port = SERVICE_PORTS[self.rng.random_range(0..SERVICE_PORTS.len())];
            (source, protocol, port)
        };
        let source_port = self.rng.random_range(32_768..=60_999);

        let captured_at = self.clock;
        self.clock += Duration::milliseconds(1);

        RawPacket::new(encode_ipv4(source, dest, protocol, Some((source_port, dest_port))))
            .with_timestamp(captured_at)
    }
}

impl PacketSource for SimulatedSource {
    fn next_packet(&mut self) -> Option<QueuedPacket> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let raw = self.next_frame();
        Some(QueuedPacket::new(
            raw,
            Box::new(TallyDisposition(Arc::clone(&self.tally))),
        ))
    }
}
