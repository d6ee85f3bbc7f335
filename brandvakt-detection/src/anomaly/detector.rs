//! Sliding-window anomaly detector.
//!
//! History append, the training trigger and scoring run under one mutex, so a packet
//! is never scored against a half-fitted model. The model is replaced wholesale on
//! every refit and never reset to the untrained state.

use std::collections::VecDeque;

use brandvakt_config::DetectorConfig;
use brandvakt_core::{Action, AnomalyPredictor, PacketInfo, StageError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::features::{extract_features, FeatureVector};
use super::model::{trainer_from_config, AnomalyModel, ModelTrainer};
use super::DetectionError;

/// Point-in-time view for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorStatus {
    pub history_len: usize,
    pub window_size: usize,
    pub trained: bool,
    pub model: Option<&'static str>,
    /// Successful fits since startup
    pub fits: u64,
}

struct DetectorState {
    history: VecDeque<PacketInfo>,
    model: Option<Box<dyn AnomalyModel>>,
    trained: bool,
    // Packets appended since the last fit attempt
    arrivals_since_fit: usize,
    fits: u64,
}

pub struct AnomalyDetector {
    window_size: usize,
    min_training_samples: usize,
    trainer: Box<dyn ModelTrainer>,
    state: Mutex<DetectorState>,
}

impl AnomalyDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self::with_trainer(
            config.window_size,
            config.min_training_samples(),
            trainer_from_config(config),
        )
    }

    pub fn with_trainer(
        window_size: usize,
        min_training_samples: usize,
        trainer: Box<dyn ModelTrainer>,
    ) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            min_training_samples: min_training_samples.max(1),
            trainer,
            state: Mutex::new(DetectorState {
                history: VecDeque::with_capacity(window_size),
                model: None,
                trained: false,
                arrivals_since_fit: 0,
                fits: 0,
            }),
        }
    }

    /// Records the packet and classifies it.
    ///
    /// Always `Accept` until the first successful fit. Refits over the current window
    /// each time `window_size` new packets have arrived since the previous attempt.
    /// Internal failures are logged and yield `Accept`.
    pub fn predict(&self, packet: &PacketInfo) -> Action {
        let mut state = self.state.lock();

        if state.history.len() == self.window_size {
            state.history.pop_front();
        }
        state.history.push_back(packet.clone());
        state.arrivals_since_fit += 1;

        let was_trained = state.trained;
        if state.arrivals_since_fit >= self.window_size {
            let window: Vec<PacketInfo> = state.history.iter().cloned().collect();
            self.fit_locked(&mut state, &window).ok();
        }

        if !was_trained {
            return Action::Accept;
        }

        match Self::classify(&state, packet) {
            Ok(action) => action,
            Err(DetectionError::MalformedAddress(addr)) => {
                debug!(source = %addr, "Unscorable source address, accepting");
                Action::Accept
            }
            Err(e) => {
                warn!(error = %e, "Anomaly prediction failed, accepting");
                Action::Accept
            }
        }
    }

    /// Fits a new model over `history`.
    ///
    /// Fails without touching the current model when fewer than the minimum number
    /// of usable samples is supplied.
    pub fn train(&self, history: &[PacketInfo]) -> Result<(), DetectionError> {
        let mut state = self.state.lock();
        self.fit_locked(&mut state, history)
    }

    /// Refits over the current window on demand.
    pub fn retrain(&self) -> Result<(), DetectionError> {
        let mut state = self.state.lock();
        let window: Vec<PacketInfo> = state.history.iter().cloned().collect();
        self.fit_locked(&mut state, &window)
    }

    pub fn is_trained(&self) -> bool {
        self.state.lock().trained
    }

    pub fn status(&self) -> DetectorStatus {
        let state = self.state.lock();
        DetectorStatus {
            history_len: state.history.len(),
            window_size: self.window_size,
            trained: state.trained,
            model: state.model.as_ref().map(|m| m.name()),
            fits: state.fits,
        }
    }

    fn fit_locked(
        &self,
        state: &mut DetectorState,
        history: &[PacketInfo],
    ) -> Result<(), DetectionError> {
        state.arrivals_since_fit = 0;

        let samples: Vec<FeatureVector> = history
            .iter()
            .filter_map(|packet| extract_features(packet).ok())
            .collect();
        let skipped = history.len() - samples.len();
        if skipped > 0 {
            debug!(skipped, "Skipped unscorable packets in training window");
        }

        if samples.len() < self.min_training_samples {
            warn!(
                have = samples.len(),
                need = self.min_training_samples,
                "Not enough data for training"
            );
            return Err(DetectionError::InsufficientSamples {
                have: samples.len(),
                need: self.min_training_samples,
            });
        }

        match self.trainer.fit(&samples) {
            Ok(model) => {
                info!(
                    model = model.name(),
                    samples = samples.len(),
                    threshold = model.threshold(),
                    "Anomaly model training completed"
                );
                state.model = Some(model);
                state.trained = true;
                state.fits += 1;
                Ok(())
            }
            Err(e) => {
                warn!(trainer = self.trainer.name(), error = %e, "Anomaly model training failed");
                Err(e)
            }
        }
    }

    fn classify(state: &DetectorState, packet: &PacketInfo) -> Result<Action, DetectionError> {
        let model = state
            .model
            .as_ref()
            .ok_or_else(|| DetectionError::Prediction("no model fitted".into()))?;
        let features = extract_features(packet)?;
        let score = model.score(&features);
        if !score.is_finite() {
            return Err(DetectionError::Prediction(format!(
                "{} produced non-finite score",
                model.name()
            )));
        }
        Ok(if score > model.threshold() {
            Action::Drop
        } else {
            Action::Accept
        })
    }
}

impl AnomalyPredictor for AnomalyDetector {
    fn predict(&self, packet: &PacketInfo) -> Result<Action, StageError> {
        Ok(AnomalyDetector::predict(self, packet))
    }
}
