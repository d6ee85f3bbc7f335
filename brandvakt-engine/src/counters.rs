use std::sync::atomic::{AtomicU64, Ordering};

use brandvakt_core::Verdict;

/// Cumulative status counters, bumped once per decided packet.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    packets_processed: AtomicU64,
    threats_blocked: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub packets_processed: u64,
    pub threats_blocked: u64,
}

impl PipelineCounters {
    pub fn record(&self, verdict: &Verdict) {
        self.packets_processed.fetch_add(1, Ordering::Relaxed);
        if !verdict.action.lets_through() {
            self.threats_blocked.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn packets_processed(&self) -> u64 {
        self.packets_processed.load(Ordering::Relaxed)
    }

    pub fn threats_blocked(&self) -> u64 {
        self.threats_blocked.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            packets_processed: self.packets_processed(),
            threats_blocked: self.threats_blocked(),
        }
    }
}
