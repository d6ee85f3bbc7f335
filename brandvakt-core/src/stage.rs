//! Seams between the decision pipeline and its three signal sources.
//!
//! Each stage owns its own state and locking; the pipeline only sees these traits,
//! so no lock is ever held across two stages.

use crate::error::StageError;
use crate::packet::PacketInfo;
use crate::rule::Rule;
use crate::verdict::Action;

/// Known-malicious address lookup. Must not block on network I/O.
pub trait ThreatLookup: Send + Sync {
    fn is_malicious(&self, ip: &str) -> Result<bool, StageError>;
}

/// Statistical traffic classifier. Returns `Accept` or `Drop`.
pub trait AnomalyPredictor: Send + Sync {
    fn predict(&self, packet: &PacketInfo) -> Result<Action, StageError>;
}

/// First-match lookup over the static rule set.
pub trait RuleMatcher: Send + Sync {
    fn rule_match(&self, packet: &PacketInfo) -> Result<Option<Rule>, StageError>;
}
