use std::net::IpAddr;

use brandvakt_config::RuleConfig;
use brandvakt_core::Rule;
use brandvakt_detection::{DetectorStatus, RuleError};
use brandvakt_engine::Firewall;
use chrono::Utc;
use validator::Validate;

use crate::error::ApiError;
use crate::schema::{
    DetectorStatusResponse, RuleResponse, StatusResponse, ThreatChange, ThreatsResponse,
};

/// Management operations over a shared `Firewall` handle.
#[derive(Clone)]
pub struct ManagementService {
    firewall: Firewall,
}

impl ManagementService {
    pub fn new(firewall: Firewall) -> Self {
        Self { firewall }
    }

    pub fn status(&self) -> StatusResponse {
        let counters = self.firewall.counters().snapshot();
        let uptime = Utc::now() - self.firewall.started_at();
        StatusResponse {
            status: "running".into(),
            uptime_secs: uptime.num_milliseconds().max(0) as f64 / 1000.0,
            rules_active: self.firewall.rules().len(),
            packets_processed: counters.packets_processed,
            threats_blocked: counters.threats_blocked,
            malicious_ips: self.firewall.threat_intel().len(),
            detector: detector_response(self.firewall.detector().status()),
        }
    }

    pub fn rules_list(&self) -> Vec<RuleResponse> {
        self.firewall
            .rules()
            .rules_list()
            .into_iter()
            .enumerate()
            .map(|(id, rule)| RuleResponse {
                id,
                rule: rule.into(),
            })
            .collect()
    }

    /// Validates and inserts a rule; the returned id is its position after sorting.
    pub fn rule_create(&self, request: RuleConfig) -> Result<RuleResponse, ApiError> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidRule(e.to_string()))?;
        let id = self.firewall.rules().rule_insert(Rule::from(request.clone()));
        Ok(RuleResponse { id, rule: request })
    }

    pub fn rule_delete(&self, id: usize) -> Result<RuleResponse, ApiError> {
        match self.firewall.rules().rule_remove(id) {
            Ok(rule) => Ok(RuleResponse {
                id,
                rule: rule.into(),
            }),
            Err(RuleError::IndexOutOfRange { .. }) => Err(ApiError::RuleNotFound(id)),
        }
    }

    pub fn threats(&self) -> ThreatsResponse {
        let snapshot = self.firewall.threat_intel().snapshot();
        ThreatsResponse {
            malicious_ips: snapshot.sorted_ips(),
            last_update: snapshot.last_update,
        }
    }

    pub fn threat_add(&self, ip: &str) -> Result<ThreatChange, ApiError> {
        let ip = canonical_ip(ip)?;
        let changed = self.firewall.threat_intel().add_ip(ip.clone());
        Ok(ThreatChange { ip, changed })
    }

    /// Removing an unlisted address succeeds with `changed: false`.
    pub fn threat_remove(&self, ip: &str) -> Result<ThreatChange, ApiError> {
        let ip = canonical_ip(ip)?;
        let changed = self.firewall.threat_intel().remove_ip(&ip);
        Ok(ThreatChange { ip, changed })
    }

    pub fn detector_retrain(&self) -> Result<DetectorStatusResponse, ApiError> {
        let detector = self.firewall.detector();
        detector
            .retrain()
            .map_err(|e| ApiError::Training(e.to_string()))?;
        Ok(detector_response(detector.status()))
    }

    /// Prometheus text exposition, `None` when metrics are disabled.
    pub fn metrics(&self) -> Result<Option<String>, ApiError> {
        self.firewall
            .metrics()
            .map(|metrics| metrics.gather_metrics())
            .transpose()
            .map_err(|e| ApiError::Metrics(e.to_string()))
    }
}

fn canonical_ip(candidate: &str) -> Result<String, ApiError> {
    candidate
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| ApiError::InvalidAddress(candidate.to_string()))
}

fn detector_response(status: DetectorStatus) -> DetectorStatusResponse {
    DetectorStatusResponse {
        trained: status.trained,
        model: status.model.map(str::to_string),
        history_len: status.history_len,
        window_size: status.window_size,
        fits: status.fits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandvakt_config::{DetectorConfig, IntelConfig, ModelKind};
    use brandvakt_core::{Action, PacketInfo, Protocol};
    use brandvakt_detection::{AnomalyDetector, RuleStore};
    use brandvakt_engine::Firewall;
    use brandvakt_intel::ThreatIntelCache;
    use std::sync::Arc;

    fn service() -> ManagementService {
        let firewall = Firewall::with_components(
            Arc::new(RuleStore::new()),
            Arc::new(ThreatIntelCache::new(Vec::new(), &IntelConfig::default())),
            Arc::new(AnomalyDetector::new(&DetectorConfig {
                window_size: 10,
                model: ModelKind::ZScore,
                ..DetectorConfig::default()
            })),
            None,
        );
        ManagementService::new(firewall)
    }

    fn rule(name: &str, priority: i32) -> RuleConfig {
        Rule::new(name, priority, Action::Drop).into()
    }

    #[test]
    fn created_rule_reports_its_sorted_position() {
        let service = service();
        service.rule_create(rule("late", 50)).unwrap();
        service.rule_create(rule("later", 90)).unwrap();

        let created = service.rule_create(rule("early", 10)).unwrap();
        assert_eq!(created.id, 0);

        let ids: Vec<(usize, String)> = service
            .rules_list()
            .into_iter()
            .map(|r| (r.id, r.rule.name))
            .collect();
        assert_eq!(
            ids,
            vec![
                (0, "early".to_string()),
                (1, "late".to_string()),
                (2, "later".to_string())
            ]
        );
    }

    #[test]
    fn invalid_rule_is_rejected_without_mutation() {
        let service = service();
        let mut bad = rule("bad name with spaces", 1);
        bad.port = Some(0);

        assert!(matches!(
            service.rule_create(bad),
            Err(ApiError::InvalidRule(_))
        ));
        assert!(service.rules_list().is_empty());
    }

    #[test]
    fn deleting_unknown_rule_is_not_found() {
        let service = service();
        service.rule_create(rule("only", 1)).unwrap();

        assert_eq!(service.rule_delete(1), Err(ApiError::RuleNotFound(1)));
        assert_eq!(service.rule_delete(0).unwrap().rule.name, "only");
        assert_eq!(service.rule_delete(0), Err(ApiError::RuleNotFound(0)));
    }

    #[test]
    fn threat_edits_validate_addresses() {
        let service = service();
        assert_eq!(
            service.threat_add(" 203.0.113.5 ").unwrap(),
            ThreatChange {
                ip: "203.0.113.5".into(),
                changed: true
            }
        );
        assert_eq!(
            service.threat_add("203.0.113.300"),
            Err(ApiError::InvalidAddress("203.0.113.300".into()))
        );

        assert!(service.threat_remove("203.0.113.5").unwrap().changed);
        assert!(!service.threat_remove("203.0.113.5").unwrap().changed);
        assert!(service.threats().malicious_ips.is_empty());
    }

    #[test]
    fn threats_are_listed_sorted() {
        let service = service();
        for ip in ["198.51.100.9", "192.0.2.1", "198.51.100.10"] {
            service.threat_add(ip).unwrap();
        }
        let threats = service.threats();
        assert_eq!(
            threats.malicious_ips,
            vec!["192.0.2.1", "198.51.100.10", "198.51.100.9"]
        );
        assert_eq!(threats.last_update, None);
    }

    #[test]
    fn status_reflects_traffic() {
        let service = service();
        service.threat_add("203.0.113.5").unwrap();
        service.rule_create(rule("deny-telnet", 1)).unwrap();

        let firewall = &service.firewall;
        firewall.decide(&PacketInfo::new("203.0.113.5", "10.0.0.1", Protocol::Tcp));
        firewall.decide(&PacketInfo::new("10.0.0.8", "10.0.0.1", Protocol::Udp));

        let status = service.status();
        assert_eq!(status.status, "running");
        assert_eq!(status.rules_active, 1);
        assert_eq!(status.packets_processed, 2);
        assert_eq!(status.threats_blocked, 2);
        assert_eq!(status.malicious_ips, 1);
        assert!(!status.detector.trained);
        assert!(status.uptime_secs >= 0.0);
    }

    #[test]
    fn retrain_needs_half_a_window() {
        let service = service();
        for i in 0..3 {
            service
                .firewall
                .decide(&PacketInfo::new(format!("10.0.0.{}", i + 1), "10.0.0.100", Protocol::Tcp));
        }
        assert!(matches!(
            service.detector_retrain(),
            Err(ApiError::Training(_))
        ));

        for i in 3..6 {
            service
                .firewall
                .decide(&PacketInfo::new(format!("10.0.0.{}", i + 1), "10.0.0.100", Protocol::Tcp));
        }
        let status = service.detector_retrain().unwrap();
        assert!(status.trained);
        assert_eq!(status.model.as_deref(), Some("z_score"));
    }

    #[test]
    fn responses_serialize_flat() {
        let service = service();
        let created = service.rule_create(rule("block-ssh", 1)).unwrap();
        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["name"], "block-ssh");
        assert_eq!(json["action"], "DROP");
    }

    #[test]
    fn metrics_absent_when_disabled() {
        assert_eq!(service().metrics(), Ok(None));
    }
}
