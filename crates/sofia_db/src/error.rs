//! Error types for the database layer.

use thiserror::Error;

use crate::sql_guard::SqlGuardError;

/// Database operation result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A generated statement failed the read-only guard
    #[error("Rejected statement: {0}")]
    Guard(#[from] SqlGuardError),

    /// Database did not answer within the connect timeout
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Malformed connection setting
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
