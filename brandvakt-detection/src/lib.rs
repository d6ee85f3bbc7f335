//! # Brandvakt Detection Engine
//!
//! Static rule matching and online-trained anomaly detection.

pub mod anomaly;
pub mod rules;

pub use anomaly::{AnomalyDetector, DetectionError, DetectorStatus};
pub use rules::{RuleError, RuleStore};
