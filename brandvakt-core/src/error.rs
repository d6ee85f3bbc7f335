use thiserror::Error;

/// Failure raised by one stage of the decision pipeline.
///
/// The pipeline never propagates these; they are logged and the packet is accepted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageError {
    #[error("Threat intelligence lookup failed: {0}")]
    ThreatLookup(String),

    #[error("Anomaly prediction failed: {0}")]
    Anomaly(String),

    #[error("Rule matching failed: {0}")]
    RuleMatch(String),
}
