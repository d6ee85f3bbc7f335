//! Static rule definitions loaded at startup.

use brandvakt_core::{Action, Rule};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// One rule as written in the configuration file.
///
/// ```yaml
/// rules:
///   - name: block-ssh
///     priority: 1
///     action: DROP
///     protocol: TCP
///     port: 22
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RuleConfig {
    #[validate(length(min = 1, max = 64))]
    #[validate(custom(function = validation::validate_rule_name))]
    pub name: String,

    /// Lower values are evaluated first.
    pub priority: i32,

    pub action: Action,

    #[validate(custom(function = validation::validate_protocol))]
    #[serde(default)]
    pub protocol: Option<String>,

    /// Destination port.
    #[validate(range(min = 1, max = 65535))]
    #[serde(default)]
    pub port: Option<u16>,

    #[validate(custom(function = validation::validate_ip))]
    #[serde(default)]
    pub source_ip: Option<String>,

    #[validate(custom(function = validation::validate_ip))]
    #[serde(default)]
    pub dest_ip: Option<String>,
}

impl From<RuleConfig> for Rule {
    fn from(config: RuleConfig) -> Self {
        Rule {
            name: config.name,
            priority: config.priority,
            action: config.action,
            protocol: config.protocol.map(|p| p.trim().to_string()),
            port: config.port,
            source_ip: config.source_ip,
            dest_ip: config.dest_ip,
        }
    }
}

impl From<Rule> for RuleConfig {
    fn from(rule: Rule) -> Self {
        RuleConfig {
            name: rule.name,
            priority: rule.priority,
            action: rule.action,
            protocol: rule.protocol,
            port: rule.port,
            source_ip: rule.source_ip,
            dest_ip: rule.dest_ip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_rule() -> RuleConfig {
        RuleConfig {
            name: "block-ssh".into(),
            priority: 1,
            action: Action::Drop,
            protocol: Some("TCP".into()),
            port: Some(22),
            source_ip: None,
            dest_ip: None,
        }
    }

    #[test]
    fn valid_rule_passes() {
        ssh_rule().validate().expect("rule should be valid");
    }

    #[test]
    fn port_zero_rejected() {
        let mut rule = ssh_rule();
        rule.port = Some(0);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn bad_address_rejected() {
        let mut rule = ssh_rule();
        rule.source_ip = Some("10.0.0".into());
        assert!(rule.validate().is_err());
    }

    #[test]
    fn unknown_protocol_rejected() {
        let mut rule = ssh_rule();
        rule.protocol = Some("carrier-pigeon".into());
        assert!(rule.validate().is_err());
    }

    #[test]
    fn converts_into_core_rule() {
        let rule: Rule = ssh_rule().into();
        assert_eq!(rule.name, "block-ssh");
        assert_eq!(rule.action, Action::Drop);
        assert_eq!(rule.port, Some(22));
    }
}
