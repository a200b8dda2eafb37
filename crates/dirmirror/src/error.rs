//! Error types for the sync engine

use std::io;
use thiserror::Error;

/// Sync engine error type
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Database(#[from] dirmirror_db::DbError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("Cannot read scan root '{path}': {message}")]
    RootUnreadable { path: String, message: String },

    #[error("Scan task failed: {0}")]
    TaskFailed(String),
}

impl SyncError {
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SyncError>;
