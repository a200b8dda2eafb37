//! Error types for the catalog store.

use thiserror::Error;

/// Catalog store result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Catalog store errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection, query, transaction)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (creating the database directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection string not understood
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    /// Request rejected before reaching the database
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored row could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a corrupt row error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
