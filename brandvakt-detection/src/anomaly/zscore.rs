//! Per-feature standard score model.
//!
//! The score of a vector is its largest absolute z-score across features.

use super::features::{FeatureVector, FEATURE_COUNT};
use super::model::{contamination_threshold, AnomalyModel, ModelTrainer};
use super::DetectionError;

/// Features are integer-valued; a one-unit deviation from a constant feature is z = 1.
const MIN_STD: f64 = 1.0;

/// Classic three-sigma floor under the contamination quantile.
const MIN_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone)]
pub struct ZScoreTrainer {
    contamination: f64,
}

impl ZScoreTrainer {
    pub fn new(contamination: f64) -> Self {
        Self { contamination }
    }
}

impl ModelTrainer for ZScoreTrainer {
    fn name(&self) -> &'static str {
        "z_score"
    }

    fn fit(&self, samples: &[FeatureVector]) -> Result<Box<dyn AnomalyModel>, DetectionError> {
        if samples.is_empty() {
            return Err(DetectionError::InsufficientSamples { have: 0, need: 1 });
        }
        let n = samples.len() as f64;

        let mut means = [0.0; FEATURE_COUNT];
        for sample in samples {
            for (mean, value) in means.iter_mut().zip(sample.as_slice()) {
                *mean += value;
            }
        }
        means.iter_mut().for_each(|mean| *mean /= n);

        let mut stds = [0.0; FEATURE_COUNT];
        for sample in samples {
            for (i, value) in sample.as_slice().iter().enumerate() {
                stds[i] += (value - means[i]).powi(2);
            }
        }
        stds.iter_mut()
            .for_each(|std| *std = (*std / n).sqrt().max(MIN_STD));

        let mut model = ZScoreModel {
            means,
            stds,
            threshold: MIN_THRESHOLD,
        };
        let scores = samples.iter().map(|s| model.score(s)).collect();
        model.threshold = contamination_threshold(scores, self.contamination).max(MIN_THRESHOLD);
        Ok(Box::new(model))
    }
}

#[derive(Debug, Clone)]
pub struct ZScoreModel {
    means: [f64; FEATURE_COUNT],
    stds: [f64; FEATURE_COUNT],
    threshold: f64,
}

impl AnomalyModel for ZScoreModel {
    fn name(&self) -> &'static str {
        "z_score"
    }

    fn score(&self, sample: &FeatureVector) -> f64 {
        sample
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, value)| ((value - self.means[i]) / self.stds[i]).abs())
            .fold(0.0, f64::max)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}
