use std::collections::HashSet;
use std::net::IpAddr;

use async_trait::async_trait;
use brandvakt_config::{FeedConfig, FeedFormat};
use serde_json::Value;
use tracing::debug;

use super::{FeedError, FeedSource};

/// A feed polled with a plain `GET`.
pub struct HttpFeed {
    name: String,
    url: String,
    format: FeedFormat,
    credential: Option<(String, String)>,
    client: reqwest::Client,
}

impl HttpFeed {
    pub fn new(config: &FeedConfig, client: reqwest::Client) -> Self {
        let credential = match (&config.api_key_header, &config.api_key) {
            (Some(header), Some(key)) => Some((header.clone(), key.clone())),
            _ => None,
        };
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            format: config.format,
            credential,
            client,
        }
    }

    fn unavailable(&self, e: reqwest::Error) -> FeedError {
        if e.is_timeout() {
            FeedError::Timeout {
                feed: self.name.clone(),
            }
        } else {
            FeedError::Unavailable {
                feed: self.name.clone(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<HashSet<String>, FeedError> {
        debug!(feed = %self.name, url = %self.url, "Polling threat feed");

        let mut request = self.client.get(&self.url);
        if let Some((header, key)) = &self.credential {
            request = request.header(header.as_str(), key.as_str());
        }
        if self.format != FeedFormat::PlainText {
            request = request.header("Accept", "application/json");
        }

        let response = request.send().await.map_err(|e| self.unavailable(e))?;
        if !response.status().is_success() {
            return Err(FeedError::Http {
                feed: self.name.clone(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.unavailable(e))?;
        parse_feed(self.format, &body).map_err(|reason| FeedError::Parse {
            feed: self.name.clone(),
            reason,
        })
    }
}

/// Extracts addresses from a feed body. Entries that are not IP addresses are dropped.
pub fn parse_feed(format: FeedFormat, body: &str) -> Result<HashSet<String>, String> {
    match format {
        FeedFormat::PlainText => Ok(parse_plain_text(body)),
        FeedFormat::OtxPulses => {
            let json: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
            Ok(parse_otx_pulses(&json))
        }
        FeedFormat::AbuseipdbBlacklist => {
            let json: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
            Ok(parse_abuseipdb(&json))
        }
    }
}

fn parse_plain_text(body: &str) -> HashSet<String> {
    body.lines()
        .filter_map(|line| line.split('#').next())
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(normalize)
        .collect()
}

fn parse_otx_pulses(json: &Value) -> HashSet<String> {
    let mut ips = HashSet::new();
    for pulse in array(json, "results") {
        for indicator in array(pulse, "indicators") {
            if indicator.get("type").and_then(Value::as_str) != Some("IPv4") {
                continue;
            }
            if let Some(ip) = indicator
                .get("indicator")
                .and_then(Value::as_str)
                .and_then(normalize)
            {
                ips.insert(ip);
            }
        }
    }
    ips
}

fn parse_abuseipdb(json: &Value) -> HashSet<String> {
    array(json, "data")
        .filter_map(|entry| entry.get("ipAddress").and_then(Value::as_str))
        .filter_map(normalize)
        .collect()
}

fn array<'a>(json: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    json.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn normalize(candidate: &str) -> Option<String> {
    let candidate = candidate.trim();
    candidate.parse::<IpAddr>().ok().map(|_| candidate.to_string())
}
