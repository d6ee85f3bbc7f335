//! Packet-path worker pool sizing.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct EngineConfig {
    /// Verdict workers draining the packet queue (0 = one per CPU).
    #[validate(range(max = 64))]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Bounded queue between the transport and the workers.
    #[validate(range(min = 1, max = 1_048_576))]
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_workers() -> usize {
    1
}

fn default_queue_depth() -> usize {
    1024
}

impl EngineConfig {
    pub fn actual_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_depth: default_queue_depth(),
        }
    }
}
