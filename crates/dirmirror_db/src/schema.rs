//! Catalog schema creation.
//!
//! All CREATE statements live here. Timestamps are INTEGER milliseconds since
//! the Unix epoch.

use crate::error::Result;
use crate::CatalogDb;
use tracing::info;

impl CatalogDb {
    /// Ensure all tables and indexes exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS path_records (
                full_path TEXT PRIMARY KEY,
                parent_path TEXT NOT NULL DEFAULT '',
                name TEXT NOT NULL,
                is_directory INTEGER NOT NULL DEFAULT 0,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                modified_at INTEGER NOT NULL,
                extension TEXT NOT NULL DEFAULT '',
                content_hash TEXT,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // Settings: key-value store (initial scan marker, etc.)
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_path_records_parent ON path_records(parent_path)",
            "CREATE INDEX IF NOT EXISTS idx_path_records_name ON path_records(name)",
            "CREATE INDEX IF NOT EXISTS idx_path_records_extension ON path_records(extension)",
            "CREATE INDEX IF NOT EXISTS idx_path_records_is_directory ON path_records(is_directory)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Catalog schema verified");
        Ok(())
    }
}
