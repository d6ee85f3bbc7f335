//! ## brandvakt-intel::cache
//! **Threat-intel cache with atomic set replacement**
//!
//! Lookups and manual edits take the `live` lock for one operation each. A refresh
//! fetches every source with no lock held and then swaps the merged set in a single
//! write, so a reader sees either the old set or the new one.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use brandvakt_config::IntelConfig;
use brandvakt_core::time::{Clock, SystemClock};
use brandvakt_core::{StageError, ThreatLookup};
use brandvakt_telemetry::MetricsRecorder;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::feeds::{FeedError, FeedSource};
use crate::snapshot::ThreatIntelSnapshot;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No threat feeds configured")]
    NoSources,

    #[error("All {attempted} threat feeds failed; previous set retained")]
    AllSourcesFailed { attempted: usize },
}

/// Outcome of one committed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub succeeded: usize,
    pub failed: usize,
    pub total_ips: usize,
}

pub struct ThreatIntelCache {
    live: RwLock<ThreatIntelSnapshot>,
    sources: Vec<Arc<dyn FeedSource>>,
    update_interval: chrono::Duration,
    fetch_timeout: Duration,
    clock: Arc<dyn Clock>,
    // Serializes refreshes; never touched by lookups
    refresh_gate: tokio::sync::Mutex<()>,
    metrics: Option<MetricsRecorder>,
}

impl ThreatIntelCache {
    pub fn new(sources: Vec<Arc<dyn FeedSource>>, config: &IntelConfig) -> Self {
        Self {
            live: RwLock::new(ThreatIntelSnapshot::default()),
            sources,
            update_interval: chrono::Duration::seconds(
                i64::try_from(config.update_interval_secs).unwrap_or(i64::MAX),
            ),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            clock: Arc::new(SystemClock),
            refresh_gate: tokio::sync::Mutex::new(()),
            metrics: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    #[inline]
    pub fn is_malicious(&self, ip: &str) -> bool {
        self.live.read().malicious_ips.contains(ip)
    }

    /// Returns `true` if the address was not already listed.
    pub fn add_ip(&self, ip: impl Into<String>) -> bool {
        let ip = ip.into();
        let inserted = self.live.write().malicious_ips.insert(ip.clone());
        info!(ip = %ip, "Added IP to threat intelligence");
        inserted
    }

    /// Removing an absent address is a no-op. Returns `true` if it was listed.
    pub fn remove_ip(&self, ip: &str) -> bool {
        let removed = self.live.write().malicious_ips.remove(ip);
        info!(ip = %ip, "Removed IP from threat intelligence");
        removed
    }

    pub fn snapshot(&self) -> ThreatIntelSnapshot {
        self.live.read().clone()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.live.read().last_update
    }

    pub fn len(&self) -> usize {
        self.live.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.read().is_empty()
    }

    /// Whether the set is at least `update_interval` old, or has never been built.
    pub fn is_due(&self) -> bool {
        match self.last_update() {
            None => true,
            Some(last) => self.clock.now() - last >= self.update_interval,
        }
    }

    /// Refreshes only when [`ThreatIntelCache::is_due`].
    pub async fn refresh_if_due(&self) -> Option<Result<RefreshReport, RefreshError>> {
        if !self.is_due() {
            return None;
        }
        Some(self.refresh().await)
    }

    /// Fetches all sources concurrently, each bounded by the fetch timeout, and
    /// replaces the live set with their union.
    ///
    /// Failing sources contribute nothing. If every source fails the live set and
    /// `last_update` are left as they were.
    pub async fn refresh(&self) -> Result<RefreshReport, RefreshError> {
        if self.sources.is_empty() {
            return Err(RefreshError::NoSources);
        }
        let _gate = self.refresh_gate.lock().await;

        let mut fetches = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let timeout = self.fetch_timeout;
            fetches.spawn(async move {
                let feed = source.name().to_string();
                let result = match tokio::time::timeout(timeout, source.fetch()).await {
                    Ok(result) => result,
                    Err(_) => Err(FeedError::Timeout { feed: feed.clone() }),
                };
                (feed, result)
            });
        }

        let mut merged = HashSet::new();
        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((feed, Ok(ips))) => {
                    debug!(feed = %feed, count = ips.len(), "Threat feed fetched");
                    merged.extend(ips);
                    succeeded += 1;
                }
                Ok((feed, Err(e))) => {
                    warn!(feed = %feed, error = %e, "Threat feed unavailable");
                    failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Threat feed task aborted");
                    failed += 1;
                }
            }
        }

        if succeeded == 0 {
            error!(attempted = failed, "All threat feeds failed, keeping previous set");
            if let Some(metrics) = &self.metrics {
                metrics.record_refresh("failed", self.len());
            }
            return Err(RefreshError::AllSourcesFailed { attempted: failed });
        }

        let now = self.clock.now();
        let total_ips = {
            let mut live = self.live.write();
            live.malicious_ips = merged;
            live.last_update = Some(live.last_update.map_or(now, |prev| prev.max(now)));
            live.malicious_ips.len()
        };

        info!(
            count = total_ips,
            succeeded, failed, "Updated threat intelligence"
        );
        if let Some(metrics) = &self.metrics {
            let outcome = if failed == 0 { "success" } else { "partial" };
            metrics.record_refresh(outcome, total_ips);
        }

        Ok(RefreshReport {
            succeeded,
            failed,
            total_ips,
        })
    }
}

impl ThreatLookup for ThreatIntelCache {
    fn is_malicious(&self, ip: &str) -> Result<bool, StageError> {
        Ok(ThreatIntelCache::is_malicious(self, ip))
    }
}
