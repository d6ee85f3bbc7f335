//! Isolation Forest.
//!
//! Anomalies are easier to isolate and thus have shorter average path lengths across
//! random isolation trees. Score is `2^(-E[h(x)] / c(psi))`, in `(0, 1]`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::features::{FeatureVector, FEATURE_COUNT};
use super::model::{contamination_threshold, AnomalyModel, ModelTrainer};
use super::DetectionError;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful BST search over `n` points, `c(n)`.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => return 0.0,
        2 => return 1.0,
        _ => {}
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

#[derive(Debug, Clone)]
pub struct IsolationForestTrainer {
    num_trees: usize,
    sample_size: usize,
    contamination: f64,
    seed: Option<u64>,
}

impl IsolationForestTrainer {
    pub fn new(num_trees: usize, sample_size: usize, contamination: f64, seed: Option<u64>) -> Self {
        Self {
            num_trees: num_trees.max(1),
            sample_size: sample_size.max(2),
            contamination,
            seed,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl ModelTrainer for IsolationForestTrainer {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn fit(&self, samples: &[FeatureVector]) -> Result<Box<dyn AnomalyModel>, DetectionError> {
        if samples.is_empty() {
            return Err(DetectionError::InsufficientSamples { have: 0, need: 1 });
        }

        let mut rng = self.rng();
        let psi = self.sample_size.min(samples.len());
        let max_depth = (psi as f64).log2().ceil() as usize;

        let trees = (0..self.num_trees)
            .map(|_| {
                // Sample with replacement
                let subsample: Vec<FeatureVector> = (0..psi)
                    .map(|_| samples[rng.random_range(0..samples.len())])
                    .collect();
                IsolationTree::build(subsample, max_depth, &mut rng)
            })
            .collect();

        let mut forest = IsolationForest {
            trees,
            normalizer: average_path_length(psi),
            threshold: f64::INFINITY,
        };
        let scores = samples.iter().map(|s| forest.score(s)).collect();
        forest.threshold = contamination_threshold(scores, self.contamination);
        Ok(Box::new(forest))
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    normalizer: f64,
    threshold: f64,
}

impl AnomalyModel for IsolationForest {
    fn name(&self) -> &'static str {
        "isolation_forest"
    }

    fn score(&self, sample: &FeatureVector) -> f64 {
        if self.trees.is_empty() || self.normalizer == 0.0 {
            return 0.5;
        }
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(sample)).sum();
        let mean_path = total / self.trees.len() as f64;
        2.0_f64.powf(-mean_path / self.normalizer)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

#[derive(Debug, Clone)]
enum IsolationNode {
    Internal {
        feature: usize,
        split: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    fn build(samples: Vec<FeatureVector>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::build_node(samples, 0, max_depth, rng),
        }
    }

    fn build_node(
        samples: Vec<FeatureVector>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> IsolationNode {
        if depth >= max_depth || samples.len() <= 1 {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
            .filter_map(|feature| {
                let (min, max) = samples.iter().fold((f64::MAX, f64::MIN), |(lo, hi), s| {
                    let v = s.get(feature);
                    (lo.min(v), hi.max(v))
                });
                (max > min).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return IsolationNode::Leaf {
                size: samples.len(),
            };
        }

        let (feature, min, max) = candidates[rng.random_range(0..candidates.len())];
        let split = rng.random_range(min..max);

        let (left, right): (Vec<FeatureVector>, Vec<FeatureVector>) =
            samples.into_iter().partition(|s| s.get(feature) < split);

        IsolationNode::Internal {
            feature,
            split,
            left: Box::new(Self::build_node(left, depth + 1, max_depth, rng)),
            right: Box::new(Self::build_node(right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, sample: &FeatureVector) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;
        loop {
            match node {
                IsolationNode::Leaf { size } => {
                    return depth as f64 + average_path_length(*size);
                }
                IsolationNode::Internal {
                    feature,
                    split,
                    left,
                    right,
                } => {
                    node = if sample.get(*feature) < *split { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}
