//! Static administrator-defined rules.

use serde::{Deserialize, Serialize};

use crate::packet::PacketInfo;
use crate::verdict::Action;

/// A match/action rule. Unset fields are wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    /// Lower values are evaluated first
    pub priority: i32,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Destination port
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_ip: Option<String>,
}

impl Rule {
    /// A wildcard rule; narrow it with the `with_*` builders.
    pub fn new(name: impl Into<String>, priority: i32, action: Action) -> Self {
        Self {
            name: name.into(),
            priority,
            action,
            protocol: None,
            port: None,
            source_ip: None,
            dest_ip: None,
        }
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    pub fn with_dest_ip(mut self, ip: impl Into<String>) -> Self {
        self.dest_ip = Some(ip.into());
        self
    }

    /// True when every field the rule sets equals the packet's field.
    pub fn matches(&self, packet: &PacketInfo) -> bool {
        if let Some(protocol) = &self.protocol {
            if !packet.protocol.matches_spec(protocol) {
                return false;
            }
        }
        if let Some(port) = self.port {
            if packet.dest_port != Some(port) {
                return false;
            }
        }
        if let Some(source_ip) = &self.source_ip {
            if packet.source_ip != *source_ip {
                return false;
            }
        }
        if let Some(dest_ip) = &self.dest_ip {
            if packet.dest_ip != *dest_ip {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Protocol;

    fn ssh_packet() -> PacketInfo {
        PacketInfo::new("10.0.0.1", "10.0.0.2", Protocol::Tcp).with_ports(51000, 22)
    }

    #[test]
    fn wildcard_rule_matches_everything() {
        let rule = Rule::new("any", 10, Action::Log);
        assert!(rule.matches(&ssh_packet()));
        assert!(rule.matches(&PacketInfo::new("1.1.1.1", "2.2.2.2", Protocol::Icmp)));
    }

    #[test]
    fn every_set_field_must_match() {
        let rule = Rule::new("ssh", 1, Action::Drop)
            .with_protocol("TCP")
            .with_port(22)
            .with_dest_ip("10.0.0.2");
        assert!(rule.matches(&ssh_packet()));

        let other_port = ssh_packet().with_dest_port(443);
        assert!(!rule.matches(&other_port));

        let udp = PacketInfo {
            protocol: Protocol::Udp,
            ..ssh_packet()
        };
        assert!(!rule.matches(&udp));
    }

    #[test]
    fn port_rule_skips_portless_packets() {
        let rule = Rule::new("dns", 5, Action::Accept).with_port(53);
        assert!(!rule.matches(&PacketInfo::new("10.0.0.1", "10.0.0.2", Protocol::Icmp)));
    }

    #[test]
    fn source_ip_compared_exactly() {
        let rule = Rule::new("bad-host", 1, Action::Drop).with_source_ip("10.0.0.1");
        assert!(rule.matches(&ssh_packet()));
        let other = PacketInfo {
            source_ip: "10.0.0.10".into(),
            ..ssh_packet()
        };
        assert!(!rule.matches(&other));
    }
}
