//! ## brandvakt-engine::pipeline
//! **Per-packet decision: threat intel, then anomaly model, then static rules**
//!
//! The first stage with a non-default outcome wins. A stage error or panic is caught
//! here and turned into a fail-open `ACCEPT`.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use brandvakt_core::{
    Action, AnomalyPredictor, PacketInfo, Provenance, RuleMatcher, StageError, ThreatLookup,
    Verdict,
};
use brandvakt_telemetry::{EventLogger, MetricsRecorder};
use opentelemetry::KeyValue;
use tracing::{debug, error};

use crate::counters::PipelineCounters;

pub struct DecisionPipeline {
    threat_intel: Arc<dyn ThreatLookup>,
    anomaly: Arc<dyn AnomalyPredictor>,
    rules: Arc<dyn RuleMatcher>,
    counters: PipelineCounters,
    metrics: Option<MetricsRecorder>,
}

impl DecisionPipeline {
    pub fn new(
        threat_intel: Arc<dyn ThreatLookup>,
        anomaly: Arc<dyn AnomalyPredictor>,
        rules: Arc<dyn RuleMatcher>,
    ) -> Self {
        Self {
            threat_intel,
            anomaly,
            rules,
            counters: PipelineCounters::default(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsRecorder) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn counters(&self) -> &PipelineCounters {
        &self.counters
    }

    /// Produces exactly one verdict. Never fails and never panics.
    pub fn decide(&self, packet: &PacketInfo) -> Verdict {
        let started = Instant::now();

        let verdict = match catch_unwind(AssertUnwindSafe(|| self.evaluate(packet))) {
            Ok(Ok(verdict)) => verdict,
            Ok(Err(e)) => {
                error!(error = %e, packet = %packet, "Pipeline stage failed, accepting packet");
                Verdict::fail_open()
            }
            Err(panic) => {
                error!(
                    panic = panic_message(panic.as_ref()),
                    packet = %packet,
                    "Pipeline stage panicked, accepting packet"
                );
                Verdict::fail_open()
            }
        };

        self.counters.record(&verdict);
        if let Some(metrics) = &self.metrics {
            metrics.record_verdict(&verdict, started.elapsed());
        }
        report(packet, &verdict);
        verdict
    }

    fn evaluate(&self, packet: &PacketInfo) -> Result<Verdict, StageError> {
        if self.threat_intel.is_malicious(&packet.source_ip)? {
            return Ok(Verdict::new(Action::Drop, Provenance::ThreatIntel));
        }
        if self.anomaly.predict(packet)? == Action::Drop {
            return Ok(Verdict::new(Action::Drop, Provenance::Anomaly));
        }
        if let Some(rule) = self.rules.rule_match(packet)? {
            return Ok(Verdict::new(rule.action, Provenance::Rule(rule.name)));
        }
        Ok(Verdict::default_accept())
    }
}

fn report(packet: &PacketInfo, verdict: &Verdict) {
    let fields = || {
        vec![
            KeyValue::new("action", verdict.action.as_str()),
            KeyValue::new("provenance", verdict.provenance.to_string()),
            KeyValue::new("source_ip", packet.source_ip.clone()),
            KeyValue::new("dest_ip", packet.dest_ip.clone()),
            KeyValue::new("protocol", packet.protocol.to_string()),
            KeyValue::new("dest_port", packet.dest_port.map_or(-1, i64::from)),
        ]
    };

    match &verdict.provenance {
        Provenance::Default => debug!(packet = %packet, "No stage matched, accepting"),
        // Already reported with the error
        Provenance::FailOpen => {}
        Provenance::ThreatIntel => EventLogger::alert("threat_intel_drop", &fields()),
        Provenance::Anomaly => EventLogger::log_event("anomaly_drop", &fields()),
        Provenance::Rule(_) => {
            let event_type = match verdict.action {
                Action::Accept => "rule_accept",
                Action::Drop => "rule_drop",
                Action::Log => "rule_log",
            };
            EventLogger::log_event(event_type, &fields());
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandvakt_core::{Protocol, Rule};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Stub {
        malicious: Vec<&'static str>,
        anomalous: bool,
        rule: Option<Rule>,
        lookups: AtomicUsize,
        predictions: AtomicUsize,
    }

    impl ThreatLookup for Stub {
        fn is_malicious(&self, ip: &str) -> Result<bool, StageError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.malicious.iter().any(|listed| *listed == ip))
        }
    }

    impl AnomalyPredictor for Stub {
        fn predict(&self, _: &PacketInfo) -> Result<Action, StageError> {
            self.predictions.fetch_add(1, Ordering::SeqCst);
            Ok(if self.anomalous { Action::Drop } else { Action::Accept })
        }
    }

    impl RuleMatcher for Stub {
        fn rule_match(&self, _: &PacketInfo) -> Result<Option<Rule>, StageError> {
            Ok(self.rule.clone())
        }
    }

    struct Broken;

    impl ThreatLookup for Broken {
        fn is_malicious(&self, _: &str) -> Result<bool, StageError> {
            Err(StageError::ThreatLookup("set poisoned".into()))
        }
    }

    impl AnomalyPredictor for Broken {
        fn predict(&self, _: &PacketInfo) -> Result<Action, StageError> {
            panic!("model exploded")
        }
    }

    impl RuleMatcher for Broken {
        fn rule_match(&self, _: &PacketInfo) -> Result<Option<Rule>, StageError> {
            Err(StageError::RuleMatch("store unavailable".into()))
        }
    }

    fn pipeline(stub: Stub) -> (DecisionPipeline, Arc<Stub>) {
        let stub = Arc::new(stub);
        (
            DecisionPipeline::new(stub.clone(), stub.clone(), stub.clone()),
            stub,
        )
    }

    fn packet() -> PacketInfo {
        PacketInfo::new("203.0.113.5", "10.0.0.1", Protocol::Tcp).with_dest_port(22)
    }

    #[test]
    fn nothing_matching_is_default_accept() {
        let (pipeline, _) = pipeline(Stub::default());
        assert_eq!(pipeline.decide(&packet()), Verdict::default_accept());
    }

    #[traced_test]
    #[test]
    fn threat_intel_short_circuits_later_stages() {
        let (pipeline, stub) = pipeline(Stub {
            malicious: vec!["203.0.113.5"],
            anomalous: true,
            rule: Some(Rule::new("allow-all", 0, Action::Accept)),
            ..Stub::default()
        });

        assert_eq!(
            pipeline.decide(&packet()),
            Verdict::new(Action::Drop, Provenance::ThreatIntel)
        );
        assert_eq!(stub.predictions.load(Ordering::SeqCst), 0);
        assert!(logs_contain("Security alert raised"));
    }

    #[test]
    fn anomaly_beats_rules() {
        let (pipeline, _) = pipeline(Stub {
            anomalous: true,
            rule: Some(Rule::new("allow-all", 0, Action::Accept)),
            ..Stub::default()
        });
        assert_eq!(
            pipeline.decide(&packet()),
            Verdict::new(Action::Drop, Provenance::Anomaly)
        );
    }

    #[traced_test]
    #[test]
    fn log_rule_is_reported_with_packet_fields() {
        let (pipeline, _) = pipeline(Stub {
            rule: Some(Rule::new("audit-ssh", 5, Action::Log)),
            ..Stub::default()
        });

        let verdict = pipeline.decide(&packet());
        assert_eq!(verdict, Verdict::new(Action::Log, Provenance::Rule("audit-ssh".into())));
        assert!(verdict.action.lets_through());
        assert!(logs_contain("source_ip=203.0.113.5"));
        assert!(logs_contain("provenance=audit-ssh"));
    }

    #[traced_test]
    #[test]
    fn stage_error_fails_open() {
        let broken = Arc::new(Broken);
        let stub = Arc::new(Stub::default());
        let pipeline = DecisionPipeline::new(broken, stub.clone(), stub);

        assert_eq!(pipeline.decide(&packet()), Verdict::fail_open());
        assert!(logs_contain("set poisoned"));
    }

    #[traced_test]
    #[test]
    fn stage_panic_fails_open() {
        let stub = Arc::new(Stub::default());
        let pipeline = DecisionPipeline::new(stub.clone(), Arc::new(Broken), stub);

        assert_eq!(pipeline.decide(&packet()), Verdict::fail_open());
        assert!(logs_contain("model exploded"));
    }

    #[test]
    fn counters_move_once_per_decision() {
        let stub = Arc::new(Stub {
            malicious: vec!["203.0.113.5"],
            ..Stub::default()
        });
        let pipeline = DecisionPipeline::new(stub.clone(), stub.clone(), Arc::new(Broken));

        pipeline.decide(&packet());
        pipeline.decide(&PacketInfo::new("10.0.0.9", "10.0.0.1", Protocol::Udp));
        assert_eq!(pipeline.counters().packets_processed(), 2);
        assert_eq!(pipeline.counters().threats_blocked(), 1);
    }

    #[test]
    fn metrics_follow_verdicts() {
        let metrics = MetricsRecorder::new().unwrap();
        let stub = Arc::new(Stub {
            anomalous: true,
            ..Stub::default()
        });
        let pipeline =
            DecisionPipeline::new(stub.clone(), stub.clone(), stub).with_metrics(metrics.clone());

        pipeline.decide(&packet());
        assert_eq!(
            metrics.verdicts.with_label_values(&["DROP", "anomaly"]).get(),
            1
        );
    }
}
