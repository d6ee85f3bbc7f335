//! Model seam: the detector only knows how to `fit` a window and `score` a vector.

use brandvakt_config::{DetectorConfig, ModelKind};

use super::features::FeatureVector;
use super::isolation_forest::IsolationForestTrainer;
use super::zscore::ZScoreTrainer;
use super::DetectionError;

/// A fitted classifier. Immutable once built; retraining replaces it.
pub trait AnomalyModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Anomaly score, higher is more anomalous.
    fn score(&self, sample: &FeatureVector) -> f64;

    /// Scores strictly above this are anomalous.
    fn threshold(&self) -> f64;

    fn is_anomalous(&self, sample: &FeatureVector) -> bool {
        self.score(sample) > self.threshold()
    }
}

/// Builds a fresh model from scratch over a training window.
pub trait ModelTrainer: Send + Sync {
    fn name(&self) -> &'static str;

    fn fit(&self, samples: &[FeatureVector]) -> Result<Box<dyn AnomalyModel>, DetectionError>;
}

pub fn trainer_from_config(config: &DetectorConfig) -> Box<dyn ModelTrainer> {
    match config.model {
        ModelKind::IsolationForest => Box::new(IsolationForestTrainer::new(
            config.num_trees,
            config.sample_size,
            config.contamination,
            config.seed,
        )),
        ModelKind::ZScore => Box::new(ZScoreTrainer::new(config.contamination)),
    }
}

/// Score below which `1 - contamination` of the training scores fall.
pub(crate) fn contamination_threshold(mut scores: Vec<f64>, contamination: f64) -> f64 {
    if scores.is_empty() {
        return f64::INFINITY;
    }
    scores.sort_by(|a, b| a.total_cmp(b));
    let n = scores.len();
    let rank = ((1.0 - contamination) * n as f64).ceil() as usize;
    scores[rank.clamp(1, n) - 1]
}
