//! Path record operations.

use crate::error::{DbError, Result};
use crate::types::{BatchUpsertResult, PathRecord};
use crate::CatalogDb;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};
use tracing::warn;

const RECORD_COLUMNS: &str = "full_path, parent_path, name, is_directory, size_bytes, modified_at, extension, content_hash, updated_at";

const UPSERT_SQL: &str = r#"
    INSERT INTO path_records (full_path, parent_path, name, is_directory, size_bytes, modified_at, extension, content_hash, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(full_path) DO UPDATE SET
        parent_path = excluded.parent_path,
        name = excluded.name,
        is_directory = excluded.is_directory,
        size_bytes = excluded.size_bytes,
        modified_at = excluded.modified_at,
        extension = excluded.extension,
        content_hash = excluded.content_hash,
        updated_at = excluded.updated_at
"#;

// Retry path: drop whatever row holds the key and write ours.
const OVERWRITE_SQL: &str = r#"
    INSERT OR REPLACE INTO path_records (full_path, parent_path, name, is_directory, size_bytes, modified_at, extension, content_hash, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

impl CatalogDb {
    /// Insert a record, or overwrite every field of the existing one.
    pub async fn upsert(&self, record: &PathRecord) -> Result<()> {
        let now = Self::now_millis();
        if let Err(first) = write_record(&self.pool, UPSERT_SQL, record, now).await {
            warn!(path = %record.full_path, error = %first, "Upsert failed, retrying as overwrite");
            write_record(&self.pool, OVERWRITE_SQL, record, now).await?;
        }
        Ok(())
    }

    /// Upsert a batch of records inside one transaction.
    ///
    /// A row that fails is retried once as a plain overwrite; if that fails
    /// too it is logged and skipped and the rest of the batch still commits.
    /// Only failing to open or commit the transaction is an error.
    pub async fn upsert_batch(&self, records: &[PathRecord]) -> Result<BatchUpsertResult> {
        let mut result = BatchUpsertResult::default();
        if records.is_empty() {
            return Ok(result);
        }

        let now = Self::now_millis();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let first = match write_record(&mut *tx, UPSERT_SQL, record, now).await {
                Ok(()) => {
                    result.upserted += 1;
                    continue;
                }
                Err(e) => e,
            };

            result.retried += 1;
            match write_record(&mut *tx, OVERWRITE_SQL, record, now).await {
                Ok(()) => {
                    warn!(path = %record.full_path, error = %first, "Upsert recovered via overwrite");
                    result.upserted += 1;
                }
                Err(second) => {
                    warn!(
                        path = %record.full_path,
                        error = %second,
                        first_error = %first,
                        "Skipping record after failed retry"
                    );
                    result.skipped += 1;
                }
            }
        }

        tx.commit().await?;
        Ok(result)
    }

    /// Look up one record.
    pub async fn get(&self, full_path: &str) -> Result<Option<PathRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM path_records WHERE full_path = ?");
        let row = sqlx::query(&sql)
            .bind(full_path)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    /// Direct children of a directory, directories first then by name.
    pub async fn find_by_parent(&self, parent_path: &str) -> Result<Vec<PathRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM path_records WHERE parent_path = ? ORDER BY is_directory DESC, name"
        );
        let rows = sqlx::query(&sql)
            .bind(parent_path)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Records whose name contains `substring`, case-insensitively.
    pub async fn find_by_name_contains(
        &self,
        substring: &str,
        limit: usize,
    ) -> Result<Vec<PathRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(&substring.to_lowercase()));
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM path_records WHERE LOWER(name) LIKE ? ESCAPE '\\' ORDER BY name, full_path LIMIT ?"
        );
        let rows = sqlx::query(&sql)
            .bind(pattern)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Delete one record. Returns the number of rows removed.
    pub async fn delete_by_path(&self, full_path: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM path_records WHERE full_path = ?")
            .bind(full_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every record below `dir_path` (not the directory itself).
    pub async fn delete_by_path_prefix(&self, dir_path: &str) -> Result<u64> {
        let pattern = descendant_pattern(dir_path)?;
        let result = sqlx::query("DELETE FROM path_records WHERE full_path LIKE ? ESCAPE '\\'")
            .bind(pattern)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete a directory record and its whole subtree atomically.
    pub async fn delete_tree(&self, dir_path: &str) -> Result<u64> {
        let pattern = descendant_pattern(dir_path)?;
        let mut tx = self.pool.begin().await?;
        let own = sqlx::query("DELETE FROM path_records WHERE full_path = ?")
            .bind(dir_path)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let below = sqlx::query("DELETE FROM path_records WHERE full_path LIKE ? ESCAPE '\\'")
            .bind(pattern)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(own + below)
    }

    /// Total number of records.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM path_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

async fn write_record<'e, E>(
    executor: E,
    sql: &str,
    record: &PathRecord,
    now: i64,
) -> std::result::Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(sql)
        .bind(&record.full_path)
        .bind(&record.parent_path)
        .bind(&record.name)
        .bind(record.is_directory)
        .bind(i64::try_from(record.size_bytes).unwrap_or(i64::MAX))
        .bind(record.modified_at.timestamp_millis())
        .bind(&record.extension)
        .bind(&record.content_hash)
        .bind(now)
        .execute(executor)
        .await?;
    Ok(())
}

fn row_to_record(row: &SqliteRow) -> Result<PathRecord> {
    let full_path: String = row.try_get("full_path")?;
    let size: i64 = row.try_get("size_bytes")?;
    let size_bytes = u64::try_from(size)
        .map_err(|_| DbError::corrupt(format!("negative size {size} for {full_path}")))?;

    Ok(PathRecord {
        parent_path: row.try_get("parent_path")?,
        name: row.try_get("name")?,
        is_directory: row.try_get("is_directory")?,
        size_bytes,
        modified_at: CatalogDb::millis_to_datetime(row.try_get("modified_at")?),
        extension: row.try_get("extension")?,
        content_hash: row.try_get("content_hash")?,
        updated_at: CatalogDb::millis_to_datetime(row.try_get("updated_at")?),
        full_path,
    })
}

fn descendant_pattern(dir_path: &str) -> Result<String> {
    if dir_path.is_empty() {
        return Err(DbError::invalid_argument(
            "refusing to delete by empty prefix (would match the whole catalog)",
        ));
    }
    Ok(format!("{}/%", escape_like(dir_path)))
}

/// Escape LIKE wildcards so user input matches literally (`\` is the escape).
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
