//! Anomaly detector tunables.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Which statistical model backs the detector.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    IsolationForest,
    ZScore,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectorConfig {
    /// Sliding history capacity; also the training trigger.
    #[validate(range(min = 2, max = 1_000_000))]
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Share of `window_size` required before a fit is attempted.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    #[serde(default = "default_min_training_fraction")]
    pub min_training_fraction: f64,

    /// Expected share of anomalous traffic; sets the scoring threshold.
    #[validate(range(exclusive_min = 0.0, max = 0.5))]
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    #[serde(default)]
    pub model: ModelKind,

    /// Isolation forest: number of trees.
    #[validate(range(min = 1, max = 1000))]
    #[serde(default = "default_num_trees")]
    pub num_trees: usize,

    /// Isolation forest: samples drawn per tree.
    #[validate(range(min = 2, max = 65536))]
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Fixed seed for reproducible fits.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_window_size() -> usize {
    1000
}

fn default_min_training_fraction() -> f64 {
    0.5
}

fn default_contamination() -> f64 {
    0.1
}

fn default_num_trees() -> usize {
    100
}

fn default_sample_size() -> usize {
    256
}

impl DetectorConfig {
    /// Usable samples required before training; never below one.
    pub fn min_training_samples(&self) -> usize {
        ((self.window_size as f64 * self.min_training_fraction).floor() as usize).max(1)
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            min_training_fraction: default_min_training_fraction(),
            contamination: default_contamination(),
            model: ModelKind::default(),
            num_trees: default_num_trees(),
            sample_size: default_sample_size(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_minimum_is_half_the_window() {
        let config = DetectorConfig::default();
        assert_eq!(config.min_training_samples(), 500);
    }

    #[test]
    fn contamination_must_be_positive() {
        let config = DetectorConfig {
            contamination: 0.0,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tiny_window_rejected() {
        let config = DetectorConfig {
            window_size: 1,
            ..DetectorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
