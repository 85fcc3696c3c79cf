//! Error types for the audit engine

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Audit error type
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Report formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Pattern error: {0}")]
    Pattern(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AuditError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AuditError>;
