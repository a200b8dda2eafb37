//! Key/value settings table.

use crate::error::Result;
use crate::CatalogDb;
use sqlx::Row;

/// Set to `"true"` once a full scan has run to completion.
pub const INITIAL_SCAN_COMPLETED: &str = "initial_scan_completed";

impl CatalogDb {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether a full scan has ever completed against this catalog.
    pub async fn initial_scan_completed(&self) -> Result<bool> {
        Ok(self.get_setting(INITIAL_SCAN_COMPLETED).await?.as_deref() == Some("true"))
    }

    pub async fn mark_initial_scan_completed(&self) -> Result<()> {
        self.set_setting(INITIAL_SCAN_COMPLETED, "true").await
    }
}
