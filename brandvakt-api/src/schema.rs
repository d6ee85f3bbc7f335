//! Wire types for management responses.

use brandvakt_config::RuleConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub uptime_secs: f64,
    pub rules_active: usize,
    pub packets_processed: u64,
    pub threats_blocked: u64,
    pub malicious_ips: usize,
    pub detector: DetectorStatusResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorStatusResponse {
    pub trained: bool,
    pub model: Option<String>,
    pub history_len: usize,
    pub window_size: usize,
    pub fits: u64,
}

/// A rule with its id, the index in current priority order.
///
/// Ids shift when rules with lower priority are inserted or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResponse {
    pub id: usize,
    #[serde(flatten)]
    pub rule: RuleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatsResponse {
    /// Sorted
    pub malicious_ips: Vec<String>,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatChange {
    pub ip: String,
    /// False when the operation was a no-op
    pub changed: bool,
}
