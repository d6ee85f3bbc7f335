//! ## brandvakt-telemetry::metrics
//! **Prometheus registry for the decision path and threat-intel refresh**

use std::time::Duration;

use brandvakt_core::Verdict;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub packets_total: IntCounter,
    pub threats_blocked: IntCounter,
    pub verdicts: IntCounterVec,
    pub decision_latency: Histogram,
    pub intel_refreshes: IntCounterVec,
    pub malicious_ips: IntGauge,
}

impl MetricsRecorder {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let packets_total =
            IntCounter::new("brandvakt_packets_total", "Packets that received a verdict")?;
        let threats_blocked = IntCounter::new(
            "brandvakt_threats_blocked_total",
            "Packets dropped by any pipeline stage",
        )?;
        let verdicts = IntCounterVec::new(
            Opts::new("brandvakt_verdicts_total", "Verdicts by action and deciding stage"),
            &["action", "provenance"],
        )?;
        let decision_latency = Histogram::with_opts(
            HistogramOpts::new(
                "brandvakt_decision_latency_ns",
                "Time spent producing one verdict",
            )
            .buckets(vec![1_000.0, 10_000.0, 100_000.0, 1_000_000.0]),
        )?;
        let intel_refreshes = IntCounterVec::new(
            Opts::new("brandvakt_intel_refresh_total", "Threat-intel refreshes by outcome"),
            &["outcome"],
        )?;
        let malicious_ips = IntGauge::new(
            "brandvakt_intel_malicious_ips",
            "Addresses in the live threat-intel set",
        )?;

        registry.register(Box::new(packets_total.clone()))?;
        registry.register(Box::new(threats_blocked.clone()))?;
        registry.register(Box::new(verdicts.clone()))?;
        registry.register(Box::new(decision_latency.clone()))?;
        registry.register(Box::new(intel_refreshes.clone()))?;
        registry.register(Box::new(malicious_ips.clone()))?;

        Ok(Self {
            registry,
            packets_total,
            threats_blocked,
            verdicts,
            decision_latency,
            intel_refreshes,
            malicious_ips,
        })
    }

    pub fn record_verdict(&self, verdict: &Verdict, elapsed: Duration) {
        self.packets_total.inc();
        if !verdict.action.lets_through() {
            self.threats_blocked.inc();
        }
        self.verdicts
            .with_label_values(&[verdict.action.as_str(), verdict.provenance.label()])
            .inc();
        self.decision_latency.observe(elapsed.as_nanos() as f64);
    }

    /// `outcome` is one of `success`, `partial`, `failed`.
    pub fn record_refresh(&self, outcome: &str, set_size: usize) {
        self.intel_refreshes.with_label_values(&[outcome]).inc();
        self.malicious_ips.set(set_size as i64);
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandvakt_core::{Action, Provenance};

    #[test]
    fn verdicts_are_counted_by_label() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_verdict(
            &Verdict::new(Action::Drop, Provenance::ThreatIntel),
            Duration::from_micros(3),
        );
        metrics.record_verdict(&Verdict::default_accept(), Duration::from_micros(1));

        assert_eq!(metrics.packets_total.get(), 2);
        assert_eq!(metrics.threats_blocked.get(), 1);
        assert_eq!(
            metrics
                .verdicts
                .with_label_values(&["DROP", "threat-intel"])
                .get(),
            1
        );
        assert_eq!(metrics.decision_latency.get_sample_count(), 2);
    }

    #[test]
    fn exposition_contains_all_families() {
        let metrics = MetricsRecorder::new().unwrap();
        metrics.record_refresh("success", 42);
        metrics.record_verdict(
            &Verdict::new(Action::Log, Provenance::Rule("audit".into())),
            Duration::from_nanos(500),
        );

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("brandvakt_packets_total 1"));
        assert!(text.contains("brandvakt_intel_malicious_ips 42"));
        assert!(text.contains("brandvakt_intel_refresh_total{outcome=\"success\"} 1"));
        assert!(text.contains("provenance=\"rule\""));
    }
}
