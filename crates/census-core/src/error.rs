//! Error types for persistence and the session boundary

use thiserror::Error;

use census_logic::CensusError;

use crate::config::ConfigError;

/// Failures talking to a storage backend or snapshot sink
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("invalid session data: {0}")]
    InvalidData(String),
    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Anything an operation that both validates and persists can fail with
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Census(#[from] CensusError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
