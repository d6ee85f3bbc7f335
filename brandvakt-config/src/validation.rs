// brandvakt-config/src/validation.rs
//! Custom validation functions shared by the configuration modules.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

static RULE_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_.:-]+$").ok());

static PROTOCOL_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new("^(?i)(tcp|udp|icmp)$").ok());

/// Rule names show up in logs and verdict provenance; keep them token-like.
pub fn validate_rule_name(name: &str) -> Result<(), ValidationError> {
    let re = RULE_NAME
        .as_ref()
        .ok_or_else(|| ValidationError::new("invalid_regex"))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_rule_name"))
    }
}

/// A protocol name (tcp, udp, icmp) or an IANA protocol number.
pub fn validate_protocol(protocol: &str) -> Result<(), ValidationError> {
    let protocol = protocol.trim();
    if protocol.parse::<u8>().is_ok() {
        return Ok(());
    }
    let re = PROTOCOL_NAME
        .as_ref()
        .ok_or_else(|| ValidationError::new("invalid_regex"))?;
    if re.is_match(protocol) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_protocol"))
    }
}

pub fn validate_ip(ip: &str) -> Result<(), ValidationError> {
    ip.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_ip_address"))
}

/// Validate log level names understood by `tracing`.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Feed endpoints must be http(s) URLs.
pub fn validate_feed_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_feed_url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_names() {
        assert!(validate_rule_name("block-ssh").is_ok());
        assert!(validate_rule_name("allow_dns.v2").is_ok());
        assert!(validate_rule_name("has space").is_err());
        assert!(validate_rule_name("").is_err());
    }

    #[test]
    fn protocols() {
        assert!(validate_protocol("TCP").is_ok());
        assert!(validate_protocol("udp").is_ok());
        assert!(validate_protocol("47").is_ok());
        assert!(validate_protocol("256").is_err());
        assert!(validate_protocol("sctp").is_err());
    }

    #[test]
    fn addresses() {
        assert!(validate_ip("203.0.113.5").is_ok());
        assert!(validate_ip("2001:db8::1").is_ok());
        assert!(validate_ip("203.0.113").is_err());
    }
}
