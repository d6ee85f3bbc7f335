use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Hostile ratio must be within [0, 1], got {0}")]
    HostileRatio(f64),
}
