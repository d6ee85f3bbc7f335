//! ## brandvakt-engine::firewall
//! **Runtime: wiring, packet disposition and the worker pool**
//!
//! Components are independently owned and shared through `Arc`; the firewall handle
//! itself is cheap to clone, one clone per worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use brandvakt_capture::{decode_ipv4, PacketSource, QueuedPacket, RawPacket};
use brandvakt_config::{BrandvaktConfig, EngineConfig};
use brandvakt_core::{Action, PacketInfo, Rule, Verdict};
use brandvakt_detection::{AnomalyDetector, RuleStore};
use brandvakt_intel::{feeds_from_config, RefreshScheduler, ThreatIntelCache};
use brandvakt_telemetry::{EventLogger, MetricsRecorder};
use chrono::{DateTime, Utc};
use crossbeam::channel;
use opentelemetry::KeyValue;
use tracing::{error, info, info_span, instrument, warn};

use crate::counters::PipelineCounters;
use crate::error::EngineError;
use crate::pipeline::DecisionPipeline;

/// What one `run` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub packets: u64,
    pub workers: usize,
}

#[derive(Clone)]
pub struct Firewall {
    pipeline: Arc<DecisionPipeline>,
    rules: Arc<RuleStore>,
    threat_intel: Arc<ThreatIntelCache>,
    detector: Arc<AnomalyDetector>,
    metrics: Option<MetricsRecorder>,
    engine: EngineConfig,
    check_interval: Duration,
    started_at: DateTime<Utc>,
}

impl Firewall {
    /// Builds every component from validated configuration.
    pub fn from_config(config: &BrandvaktConfig) -> Result<Self, EngineError> {
        let metrics = if config.telemetry.metrics {
            Some(MetricsRecorder::new()?)
        } else {
            None
        };

        let rules = Arc::new(RuleStore::with_rules(
            config.rules.iter().cloned().map(Rule::from),
        ));
        let mut threat_intel = ThreatIntelCache::new(feeds_from_config(&config.intel)?, &config.intel);
        if let Some(metrics) = &metrics {
            threat_intel = threat_intel.with_metrics(metrics.clone());
        }
        let detector = Arc::new(AnomalyDetector::new(&config.detector));

        info!(
            rules = rules.len(),
            feeds = config.intel.feeds.iter().filter(|f| f.enabled).count(),
            window_size = config.detector.window_size,
            model = ?config.detector.model,
            "Firewall configured"
        );

        let mut firewall = Self::with_components(rules, Arc::new(threat_intel), detector, metrics);
        firewall.engine = config.engine.clone();
        firewall.check_interval = Duration::from_secs(config.intel.check_interval_secs);
        Ok(firewall)
    }

    pub fn with_components(
        rules: Arc<RuleStore>,
        threat_intel: Arc<ThreatIntelCache>,
        detector: Arc<AnomalyDetector>,
        metrics: Option<MetricsRecorder>,
    ) -> Self {
        let mut pipeline = DecisionPipeline::new(
            threat_intel.clone(),
            detector.clone(),
            rules.clone(),
        );
        if let Some(metrics) = &metrics {
            pipeline = pipeline.with_metrics(metrics.clone());
        }

        Self {
            pipeline: Arc::new(pipeline),
            rules,
            threat_intel,
            detector,
            metrics,
            engine: EngineConfig::default(),
            check_interval: Duration::from_secs(60),
            started_at: Utc::now(),
        }
    }

    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    pub fn threat_intel(&self) -> &Arc<ThreatIntelCache> {
        &self.threat_intel
    }

    pub fn detector(&self) -> &Arc<AnomalyDetector> {
        &self.detector
    }

    pub fn counters(&self) -> &PipelineCounters {
        self.pipeline.counters()
    }

    pub fn metrics(&self) -> Option<&MetricsRecorder> {
        self.metrics.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn decide(&self, packet: &PacketInfo) -> Verdict {
        self.pipeline.decide(packet)
    }

    /// Decides a queued packet and invokes its disposition exactly once.
    ///
    /// Undecodable frames and any panic on the way are resolved as `accept`.
    pub fn handle_packet(&self, queued: QueuedPacket) -> Action {
        let QueuedPacket { raw, disposition } = queued;

        let action = catch_unwind(AssertUnwindSafe(|| self.classify(&raw))).unwrap_or_else(|_| {
            error!(len = raw.len(), "Packet handling panicked, accepting packet");
            Action::Accept
        });

        match action {
            Action::Drop => disposition.drop_packet(),
            Action::Accept | Action::Log => disposition.accept(),
        }
        action
    }

    fn classify(&self, raw: &RawPacket) -> Action {
        match decode_ipv4(raw) {
            Ok(packet) => self.pipeline.decide(&packet).action,
            Err(e) => {
                error!(error = %e, len = raw.len(), "Undecodable packet, accepting");
                Action::Accept
            }
        }
    }

    /// Drains `source` through the worker pool until it is exhausted.
    ///
    /// The source is pumped on a blocking task into a bounded queue; each worker thread
    /// handles one packet at a time. The threat-intel scheduler runs for the duration
    /// and is shut down once every packet has its disposition.
    #[instrument(level = "info", name = "firewall_run", skip_all)]
    pub async fn run<S>(&self, source: S) -> Result<RunSummary, EngineError>
    where
        S: PacketSource + 'static,
    {
        let workers = self.engine.actual_workers();
        let scheduler = self
            .threat_intel
            .has_sources()
            .then(|| RefreshScheduler::spawn(Arc::clone(&self.threat_intel), self.check_interval));

        let (tx, rx) = channel::bounded::<QueuedPacket>(self.engine.queue_depth);
        info!(workers, queue_depth = self.engine.queue_depth, "Packet workers starting");

        let worker_handles: Vec<_> = (0..workers)
            .map(|id| {
                let rx = rx.clone();
                let firewall = self.clone();
                tokio::task::spawn_blocking(move || {
                    let _span = info_span!("packet_worker", id).entered();
                    rx.iter()
                        .map(|queued| firewall.handle_packet(queued))
                        .count() as u64
                })
            })
            .collect();
        drop(rx);

        let pump = tokio::task::spawn_blocking(move || {
            let mut source = source;
            while let Some(queued) = source.next_packet() {
                if let Err(channel::SendError(orphan)) = tx.send(queued) {
                    warn!("All packet workers gone, accepting remaining packet");
                    orphan.disposition.accept();
                    break;
                }
            }
        });

        let pumped = pump.await;
        let mut packets = 0;
        for handle in worker_handles {
            packets += handle.await?;
        }
        if let Some(scheduler) = scheduler {
            scheduler.shutdown().await?;
        }
        pumped?;

        let counters = self.counters().snapshot();
        EventLogger::log_event(
            "run_complete",
            &[
                KeyValue::new("packets", packets as i64),
                KeyValue::new("packets_processed", counters.packets_processed as i64),
                KeyValue::new("threats_blocked", counters.threats_blocked as i64),
            ],
        );

        Ok(RunSummary { packets, workers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brandvakt_capture::{encode_ipv4, Disposition, SimulatedSource};
    use brandvakt_config::{DetectorConfig, IntelConfig, ModelKind};
    use brandvakt_core::{Protocol, Provenance};
    use brandvakt_intel::{FeedError, FeedSource};
    use std::collections::HashSet;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn firewall() -> Firewall {
        Firewall::with_components(
            Arc::new(RuleStore::new()),
            Arc::new(ThreatIntelCache::new(Vec::new(), &IntelConfig::default())),
            Arc::new(AnomalyDetector::new(&DetectorConfig::default())),
            None,
        )
    }

    fn ssh_probe() -> PacketInfo {
        PacketInfo::new("203.0.113.5", "10.0.0.1", Protocol::Tcp)
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<&'static str>>>);

    impl Disposition for Recorder {
        fn accept(self: Box<Self>) {
            self.0.lock().unwrap().push("accept");
        }

        fn drop_packet(self: Box<Self>) {
            self.0.lock().unwrap().push("drop");
        }
    }

    fn queued(frame: Vec<u8>, recorder: &Recorder) -> QueuedPacket {
        QueuedPacket::new(RawPacket::new(frame), Box::new(recorder.clone()))
    }

    #[test]
    fn clean_state_accepts_with_default_provenance() {
        let verdict = firewall().decide(&ssh_probe());
        assert_eq!(verdict, Verdict::default_accept());
    }

    #[test]
    fn listed_source_is_dropped_by_threat_intel() {
        let firewall = firewall();
        firewall.threat_intel().add_ip("203.0.113.5");
        firewall
            .rules()
            .rule_insert(Rule::new("allow-everything", 0, Action::Accept));

        assert_eq!(
            firewall.decide(&ssh_probe()),
            Verdict::new(Action::Drop, Provenance::ThreatIntel)
        );
    }

    #[test]
    fn ssh_rule_drops_matching_packet() {
        let firewall = firewall();
        firewall.rules().rule_insert(
            Rule::new("block-ssh", 1, Action::Drop)
                .with_protocol("TCP")
                .with_port(22),
        );

        let packet = PacketInfo::new("10.0.0.1", "10.0.0.2", Protocol::Tcp).with_ports(51_000, 22);
        assert_eq!(
            firewall.decide(&packet),
            Verdict::new(Action::Drop, Provenance::Rule("block-ssh".into()))
        );
        assert_eq!(firewall.counters().threats_blocked(), 1);
    }

    #[test]
    fn untrained_detector_never_drops() {
        let detector = Arc::new(AnomalyDetector::new(&DetectorConfig {
            window_size: 100,
            model: ModelKind::ZScore,
            ..DetectorConfig::default()
        }));
        let firewall = Firewall::with_components(
            Arc::new(RuleStore::new()),
            Arc::new(ThreatIntelCache::new(Vec::new(), &IntelConfig::default())),
            detector.clone(),
            None,
        );

        for i in 0..49 {
            firewall.decide(&PacketInfo::new(format!("10.0.0.{}", i + 1), "10.0.0.200", Protocol::Tcp));
        }
        // Wildly out-of-distribution, but the model has not been fitted
        let verdict = firewall.decide(&PacketInfo::new("250.250.250.250", "10.0.0.200", Protocol::Udp));
        assert_eq!(verdict, Verdict::default_accept());
        assert!(!detector.is_trained());
        assert_eq!(firewall.counters().threats_blocked(), 0);
    }

    #[test]
    fn handle_packet_disposes_exactly_once() {
        let firewall = firewall();
        firewall.threat_intel().add_ip("203.0.113.5");
        let recorder = Recorder::default();

        let hostile = encode_ipv4(
            Ipv4Addr::new(203, 0, 113, 5),
            Ipv4Addr::new(10, 0, 0, 1),
            Protocol::Tcp,
            Some((40_000, 443)),
        );
        let benign = encode_ipv4(
            Ipv4Addr::new(192, 168, 1, 10),
            Ipv4Addr::new(10, 0, 0, 1),
            Protocol::Udp,
            Some((40_000, 53)),
        );

        assert_eq!(
            firewall.handle_packet(queued(hostile.to_vec(), &recorder)),
            Action::Drop
        );
        assert_eq!(
            firewall.handle_packet(queued(benign.to_vec(), &recorder)),
            Action::Accept
        );
        assert_eq!(*recorder.0.lock().unwrap(), vec!["drop", "accept"]);
    }

    #[test]
    fn garbage_frame_is_accepted() {
        let firewall = firewall();
        let recorder = Recorder::default();

        let action = firewall.handle_packet(queued(vec![0xde, 0xad], &recorder));
        assert_eq!(action, Action::Accept);
        assert_eq!(*recorder.0.lock().unwrap(), vec!["accept"]);
        assert_eq!(firewall.counters().packets_processed(), 0);
    }

    struct CountingFeed(AtomicUsize);

    #[async_trait]
    impl FeedSource for CountingFeed {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self) -> Result<HashSet<String>, FeedError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(HashSet::from(["203.0.113.1".to_string()]))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn run_disposes_every_simulated_packet() {
        let feed = Arc::new(CountingFeed(AtomicUsize::new(0)));
        let intel = ThreatIntelCache::new(vec![feed.clone() as Arc<dyn FeedSource>], &IntelConfig::default());
        let firewall = Firewall::with_components(
            Arc::new(RuleStore::new()),
            Arc::new(intel),
            Arc::new(AnomalyDetector::new(&DetectorConfig::default())),
            Some(MetricsRecorder::new().unwrap()),
        )
        .with_engine_config(EngineConfig {
            workers: 3,
            queue_depth: 16,
        })
        .with_check_interval(Duration::from_millis(10));

        let source = SimulatedSource::new(500, 42, 0.2);
        let tally = source.tally();
        let summary = firewall.run(source).await.unwrap();

        assert_eq!(summary, RunSummary { packets: 500, workers: 3 });
        assert_eq!(tally.total(), 500);
        assert_eq!(firewall.counters().packets_processed(), 500);
        assert_eq!(
            firewall.metrics().map(|m| m.packets_total.get()),
            Some(500)
        );
    }

    #[test]
    fn from_config_loads_rules_in_priority_order() {
        let mut config = BrandvaktConfig::default();
        config.rules = vec![
            Rule::new("second", 20, Action::Log).into(),
            Rule::new("first", 10, Action::Drop).with_port(23).into(),
        ];
        config.telemetry.metrics = false;

        let firewall = Firewall::from_config(&config).unwrap();
        let names: Vec<String> = firewall
            .rules()
            .rules_list()
            .into_iter()
            .map(|rule| rule.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
        assert!(firewall.metrics().is_none());
    }
}
