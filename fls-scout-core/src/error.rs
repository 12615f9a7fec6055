use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("UTC offset must be between -23 and +23 hours, got {0}")]
    InvalidUtcOffset(i32),

    #[error("Worker count must be at least 1")]
    NoWorkers,

    #[error("Probe timeout must be greater than zero")]
    ZeroTimeout,
}
