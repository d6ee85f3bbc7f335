//! ## brandvakt-intel::feeds
//! **Feed-fetch capabilities injected into the cache**
//!
//! Every source is a `FeedSource`; the cache never knows about URLs or credentials.

mod http;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use brandvakt_config::IntelConfig;
use thiserror::Error;

pub use http::{parse_feed, HttpFeed};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Feed {feed} unavailable: {reason}")]
    Unavailable { feed: String, reason: String },

    #[error("Feed {feed} returned HTTP {status}")]
    Http { feed: String, status: u16 },

    #[error("Feed {feed} sent an unreadable body: {reason}")]
    Parse { feed: String, reason: String },

    #[error("Feed {feed} timed out")]
    Timeout { feed: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// One external source of malicious addresses.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<HashSet<String>, FeedError>;
}

/// Builds one `HttpFeed` per enabled feed, sharing a single connection pool.
pub fn feeds_from_config(config: &IntelConfig) -> Result<Vec<Arc<dyn FeedSource>>, FeedError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(concat!("brandvakt/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FeedError::Client(e.to_string()))?;

    Ok(config
        .feeds
        .iter()
        .filter(|feed| feed.enabled)
        .map(|feed| Arc::new(HttpFeed::new(feed, client.clone())) as Arc<dyn FeedSource>)
        .collect())
}
