//! Threat-intelligence refresh configuration.
//!
//! Feed endpoints and credentials live here and nowhere else.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[validate(schema(function = "validate_timeouts"))]
pub struct IntelConfig {
    /// Minimum age of the malicious-IP set before it is refreshed (seconds).
    #[validate(range(min = 1, max = 604_800))]
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,

    /// How often the scheduler checks whether a refresh is due (seconds).
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,

    /// Per-feed fetch bound (seconds).
    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[validate(nested)]
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

fn default_update_interval() -> u64 {
    3600
}

fn default_check_interval() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    30
}

fn validate_timeouts(config: &IntelConfig) -> Result<(), ValidationError> {
    if config.fetch_timeout_secs > config.update_interval_secs {
        return Err(ValidationError::new("fetch_timeout_exceeds_update_interval"));
    }
    Ok(())
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval(),
            check_interval_secs: default_check_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            feeds: Vec::new(),
        }
    }
}

/// Body layout of a feed response.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    /// AlienVault OTX `pulses/subscribed`: `results[].indicators[]` with `type == "IPv4"`
    OtxPulses,
    /// AbuseIPDB `blacklist`: `data[].ipAddress`
    ///
    /// Filters such as the confidence floor are query parameters of the configured
    /// URL, e.g. `https://api.abuseipdb.com/api/v2/blacklist?confidenceMinimum=90`.
    AbuseipdbBlacklist,
    /// One address per line, `#` comments
    PlainText,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct FeedConfig {
    #[validate(length(min = 1, max = 64))]
    pub name: String,

    /// Full request URL, query string included; it is sent unchanged.
    #[validate(custom(function = validation::validate_feed_url))]
    pub url: String,

    pub format: FeedFormat,

    /// Header carrying the credential, e.g. `X-OTX-API-KEY` or `Key`.
    #[serde(default)]
    pub api_key_header: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intel_config_is_valid() {
        IntelConfig::default()
            .validate()
            .expect("default intel config should validate");
    }

    #[test]
    fn fetch_timeout_bounded_by_update_interval() {
        let config = IntelConfig {
            update_interval_secs: 10,
            fetch_timeout_secs: 30,
            ..IntelConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn abuseipdb_filters_travel_in_the_url() {
        let feed: FeedConfig = serde_json::from_str(
            r#"{
                "name": "abuseipdb",
                "url": "https://api.abuseipdb.com/api/v2/blacklist?confidenceMinimum=90",
                "format": "abuseipdb_blacklist",
                "api_key_header": "Key",
                "api_key": "secret"
            }"#,
        )
        .unwrap();

        feed.validate().expect("feed with query string should validate");
        assert_eq!(feed.format, FeedFormat::AbuseipdbBlacklist);
        assert!(feed.url.ends_with("?confidenceMinimum=90"));
        assert!(feed.enabled);
    }

    #[test]
    fn feed_url_must_be_http() {
        let mut config = IntelConfig::default();
        config.feeds.push(FeedConfig {
            name: "local".into(),
            url: "file:///etc/blocklist".into(),
            format: FeedFormat::PlainText,
            api_key_header: None,
            api_key: None,
            enabled: true,
        });
        assert!(config.validate().is_err());
    }
}
