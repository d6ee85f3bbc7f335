use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// The malicious-address set and the time it was last rebuilt from feeds.
///
/// `last_update` is `None` until the first successful refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatIntelSnapshot {
    pub malicious_ips: HashSet<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl ThreatIntelSnapshot {
    pub fn len(&self) -> usize {
        self.malicious_ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.malicious_ips.is_empty()
    }

    /// Addresses in lexical order, for stable listings.
    pub fn sorted_ips(&self) -> Vec<String> {
        let mut ips: Vec<String> = self.malicious_ips.iter().cloned().collect();
        ips.sort();
        ips
    }
}
