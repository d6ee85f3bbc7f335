//! Terminal per-packet decisions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What the transport does with a packet. `Log` accepts after logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    #[serde(alias = "accept")]
    Accept,
    #[serde(alias = "drop")]
    Drop,
    #[serde(alias = "log")]
    Log,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Accept => "ACCEPT",
            Action::Drop => "DROP",
            Action::Log => "LOG",
        }
    }

    /// Whether the packet ends up on the wire.
    pub fn lets_through(self) -> bool {
        !matches!(self, Action::Drop)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which pipeline stage produced a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    ThreatIntel,
    Anomaly,
    /// A static rule, by name
    Rule(String),
    Default,
    /// A stage failed and the packet was let through
    FailOpen,
}

impl Provenance {
    /// Low-cardinality label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::ThreatIntel => "threat-intel",
            Provenance::Anomaly => "anomaly",
            Provenance::Rule(_) => "rule",
            Provenance::Default => "default",
            Provenance::FailOpen => "fail-open",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Rule(name) => f.write_str(name),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub action: Action,
    pub provenance: Provenance,
}

impl Verdict {
    pub fn new(action: Action, provenance: Provenance) -> Self {
        Self { action, provenance }
    }

    /// `ACCEPT` because nothing matched.
    pub fn default_accept() -> Self {
        Self::new(Action::Accept, Provenance::Default)
    }

    /// `ACCEPT` because a stage failed.
    pub fn fail_open() -> Self {
        Self::new(Action::Accept, Provenance::FailOpen)
    }

    pub fn is_default(&self) -> bool {
        self.action == Action::Accept && self.provenance == Provenance::Default
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.action, self.provenance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_deserializes_either_case() {
        let upper: Action = serde_json::from_str("\"DROP\"").unwrap();
        let lower: Action = serde_json::from_str("\"log\"").unwrap();
        assert_eq!(upper, Action::Drop);
        assert_eq!(lower, Action::Log);
        assert!(serde_json::from_str::<Action>("\"REJECT\"").is_err());
    }

    #[test]
    fn log_lets_packet_through() {
        assert!(Action::Log.lets_through());
        assert!(Action::Accept.lets_through());
        assert!(!Action::Drop.lets_through());
    }

    #[test]
    fn provenance_display_uses_rule_name() {
        let verdict = Verdict::new(Action::Drop, Provenance::Rule("block-ssh".into()));
        assert_eq!(verdict.to_string(), "DROP (block-ssh)");
        assert_eq!(verdict.provenance.label(), "rule");
        assert_eq!(Provenance::ThreatIntel.to_string(), "threat-intel");
    }

    #[test]
    fn only_plain_accept_is_default() {
        assert!(Verdict::default_accept().is_default());
        assert!(!Verdict::fail_open().is_default());
        assert!(!Verdict::new(Action::Accept, Provenance::Rule("r".into())).is_default());
    }
}
