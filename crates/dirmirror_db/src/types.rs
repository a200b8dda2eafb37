//! Catalog entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cataloged filesystem entry, keyed by `full_path`.
///
/// Paths are relative to the mirrored root and always use `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    /// Unique key, e.g. `movies/a.mp4`
    pub full_path: String,
    /// Containing directory's `full_path`; empty for root-level entries
    pub parent_path: String,
    /// Last path segment
    pub name: String,
    pub is_directory: bool,
    /// Always 0 for directories
    pub size_bytes: u64,
    /// Filesystem modification time
    pub modified_at: DateTime<Utc>,
    /// Lowercased extension including the dot; empty for directories
    pub extension: String,
    /// Hex digest, only present for files hashed during a full scan
    pub content_hash: Option<String>,
    /// When this row was last written
    pub updated_at: DateTime<Utc>,
}

/// Outcome of [`crate::CatalogDb::upsert_batch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchUpsertResult {
    /// Rows written (first attempt or retry)
    pub upserted: u64,
    /// Rows that needed the overwrite retry
    pub retried: u64,
    /// Rows that failed both attempts and were skipped
    pub skipped: u64,
}
