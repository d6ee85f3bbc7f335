use brandvakt_config::ConfigError;
use brandvakt_intel::FeedError;
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Threat feed setup failed: {0}")]
    Feed(#[from] FeedError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Task failed: {0}")]
    Join(#[from] JoinError),
}
