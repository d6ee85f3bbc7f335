//! # brandvakt-core
//!
//! Shared vocabulary for the Brandvakt packet firewall: the normalized packet view,
//! static rules, verdicts with provenance, and the stage seams the decision pipeline
//! composes.
//!
//! ### Key Submodules:
//! - `packet`: `PacketInfo` and `Protocol`
//! - `rule`: administrator-defined match/action rules
//! - `verdict`: terminal `Action` plus `Provenance`
//! - `stage`: traits implemented by threat intel, anomaly detection and the rule store
//! - `time`: injectable clocks for refresh scheduling

pub mod error;
pub mod packet;
pub mod rule;
pub mod stage;
pub mod time;
pub mod verdict;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::packet::*;
    pub use crate::rule::*;
    pub use crate::stage::*;
    pub use crate::time::*;
    pub use crate::verdict::*;
}

pub use error::StageError;
pub use packet::{PacketInfo, Protocol};
pub use rule::Rule;
pub use stage::{AnomalyPredictor, RuleMatcher, ThreatLookup};
pub use verdict::{Action, Provenance, Verdict};

#[cfg(test)]
mod tests {
    use crate::{
        Action, AnomalyPredictor, PacketInfo, Protocol, Rule, RuleMatcher, StageError,
        ThreatLookup,
    };

    struct Everything;

    impl ThreatLookup for Everything {
        fn is_malicious(&self, ip: &str) -> Result<bool, StageError> {
            Ok(ip.starts_with("203.0.113."))
        }
    }

    impl AnomalyPredictor for Everything {
        fn predict(&self, _: &PacketInfo) -> Result<Action, StageError> {
            Ok(Action::Accept)
        }
    }

    impl RuleMatcher for Everything {
        fn rule_match(&self, _: &PacketInfo) -> Result<Option<Rule>, StageError> {
            Err(StageError::RuleMatch("empty".into()))
        }
    }

    #[test]
    fn stage_traits_are_usable_from_crate_root() {
        let stage = Everything;
        let packet = PacketInfo::new("203.0.113.5", "10.0.0.1", Protocol::Tcp);
        assert_eq!(ThreatLookup::is_malicious(&stage, &packet.source_ip), Ok(true));
        assert_eq!(AnomalyPredictor::predict(&stage, &packet), Ok(Action::Accept));
        assert!(RuleMatcher::rule_match(&stage, &packet).is_err());
    }
}
