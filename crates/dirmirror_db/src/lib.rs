//! Durable path catalog for dirmirror
//!
//! This crate owns every SQL statement that touches the catalog. The sync
//! engine writes through [`CatalogDb`]; nothing else talks to the database.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dirmirror_db::{CatalogDb, DbConfig};
//!
//! let db = CatalogDb::connect(&DbConfig::from_url("sqlite:catalog.db?mode=rwc")?).await?;
//! let children = db.find_by_parent("movies").await?;
//! ```

mod error;
mod pool;
mod schema;
mod types;

// Method implementations organized by table
mod catalog;
mod settings;

pub use error::{DbError, Result};
pub use pool::{create_pool, DbConfig};
pub use settings::INITIAL_SCAN_COMPLETED;
pub use types::{BatchUpsertResult, PathRecord};

use sqlx::sqlite::SqlitePool;
use std::path::Path;
use tracing::info;

/// Handle to the catalog database. Clone is cheap and shares the pool.
#[derive(Clone)]
pub struct CatalogDb {
    pool: SqlitePool,
}

impl std::fmt::Debug for CatalogDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogDb")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl CatalogDb {
    /// Connect using the given configuration and create the schema.
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let pool = pool::create_pool(config).await?;
        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Open or create a database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Self::connect(&DbConfig::sqlite(path)).await?;
        info!(path = %path.display(), "Catalog opened");
        Ok(db)
    }

    /// Fresh in-memory catalog (for testing).
    pub async fn open_in_memory() -> Result<Self> {
        Self::connect(&DbConfig::sqlite_memory()).await
    }

    /// Underlying pool (escape hatch for diagnostics).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl CatalogDb {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
