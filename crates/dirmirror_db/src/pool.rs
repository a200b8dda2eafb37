//! Connection configuration and pool creation.
//!
//! The catalog lives in SQLite. File databases run in WAL mode with a busy
//! timeout so concurrent directory scans can share the pool; in-memory
//! databases are pinned to a single long-lived connection because every
//! SQLite connection to `:memory:` opens a separate database.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

use crate::error::{DbError, Result};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// sqlx connection URL
    pub url: String,
    /// Maximum connections in the pool
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// Configuration for a database file, created on first open.
    pub fn sqlite(path: impl AsRef<Path>) -> Self {
        Self {
            url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// In-memory configuration (for testing).
    pub fn sqlite_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    /// Build from a connection string.
    ///
    /// Accepts `sqlite:` URLs as-is; anything without a scheme is treated as
    /// a database file path.
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(DbError::InvalidUrl("empty connection string".to_string()));
        }
        if trimmed.starts_with("sqlite:") {
            let is_memory = trimmed.contains(":memory:");
            return Ok(Self {
                url: trimmed.to_string(),
                max_connections: if is_memory { 1 } else { DEFAULT_MAX_CONNECTIONS },
                busy_timeout: DEFAULT_BUSY_TIMEOUT,
            });
        }
        if trimmed.contains("://") {
            return Err(DbError::InvalidUrl(trimmed.to_string()));
        }
        Ok(Self::sqlite(trimmed))
    }

    /// Set maximum connections.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Whether this points at an in-memory database.
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }

    /// Database file backing this configuration, if any.
    pub fn file_path(&self) -> Option<PathBuf> {
        if self.is_memory() {
            return None;
        }
        let rest = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or_default();
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

/// Create a connection pool for the configuration.
pub async fn create_pool(config: &DbConfig) -> Result<SqlitePool> {
    if let Some(path) = config.file_path() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .busy_timeout(config.busy_timeout)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections);

    if config.is_memory() {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
    }

    let pool = pool_options.connect_with(options).await?;
    info!(url = %config.url, "Connected to catalog database");
    Ok(pool)
}
