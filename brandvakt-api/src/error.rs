use thiserror::Error;

/// A rejected management operation. Core state is untouched when one is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Rule not found: {0}")]
    RuleNotFound(usize),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid IP address: {0:?}")]
    InvalidAddress(String),

    #[error("Detector retraining refused: {0}")]
    Training(String),

    #[error("Metrics unavailable: {0}")]
    Metrics(String),
}
