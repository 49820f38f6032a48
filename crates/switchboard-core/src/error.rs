//! Error types shared by Switchboard crates

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Rejected request paths
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path traversal attempt blocked: {0}")]
    Traversal(String),

    #[error("path too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },
}
