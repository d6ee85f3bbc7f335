//! ## brandvakt-detection::anomaly
//! **Online-trained traffic anomaly detection**
//!
//! ### Components:
//! - `features`: fixed-size numeric vectors from `PacketInfo`
//! - `model`: `ModelTrainer`/`AnomalyModel` seam, so the statistical method is swappable
//! - `isolation_forest`: random isolation trees (default)
//! - `zscore`: per-feature standard score model
//! - `detector`: sliding window, training trigger, fail-open prediction

pub mod detector;
pub mod features;
pub mod isolation_forest;
pub mod model;
pub mod zscore;

use thiserror::Error;

pub use detector::{AnomalyDetector, DetectorStatus};
pub use features::{extract_features, FeatureVector, FEATURE_COUNT};
pub use isolation_forest::IsolationForestTrainer;
pub use model::{trainer_from_config, AnomalyModel, ModelTrainer};
pub use zscore::ZScoreTrainer;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectionError {
    #[error("Malformed source address: {0:?}")]
    MalformedAddress(String),

    #[error("Not enough samples to train: have {have}, need {need}")]
    InsufficientSamples { have: usize, need: usize },

    #[error("Prediction failed: {0}")]
    Prediction(String),
}
