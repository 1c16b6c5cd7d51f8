//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fetching or parsing a configuration file.
///
/// Callers normally go through `GameConfig::load_or_default`, which logs these
/// and falls back to built-in defaults.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reasons a fire request was rejected. A rejected shot changes no state.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FireError {
    #[error("session has ended")]
    SessionEnded,
    #[error("invalid shot: direction must be a unit vector and speed positive")]
    InvalidShot,
    #[error("too many projectiles in flight (limit {limit})")]
    TooManyProjectiles { limit: usize },
}
