use super::{ScanDepth, SyncCoordinator};
use crate::error::{Result, SyncError};
use crate::handle::{CancellationToken, ScanHandle};
use crate::paths;
use std::io;
use tracing::{info, warn};

/// What a rename did.
#[derive(Debug)]
pub struct RenameOutcome {
    /// Catalog path of the renamed entry
    pub new_path: String,
    /// Background scan cataloguing a renamed directory's contents
    pub subtree_scan: Option<ScanHandle>,
}

impl SyncCoordinator {
    /// Delete `path` from disk and from the catalog.
    ///
    /// A directory is removed recursively along with every catalog record
    /// below it. If the path is already gone from disk but still catalogued,
    /// the catalog is cleaned up anyway. Returns the number of records removed.
    pub async fn delete_path(&self, path: &str) -> Result<u64> {
        let rel = paths::normalize(path)?;
        if rel.is_empty() {
            return Err(SyncError::invalid_path("refusing to delete the mirrored root"));
        }
        let fs_path = paths::to_fs_path(self.root(), &rel);

        let is_directory = match tokio::fs::symlink_metadata(&fs_path).await {
            Ok(meta) => {
                if meta.is_dir() {
                    tokio::fs::remove_dir_all(&fs_path).await?;
                } else {
                    tokio::fs::remove_file(&fs_path).await?;
                }
                meta.is_dir()
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match self.db().get(&rel).await? {
                    Some(record) => {
                        warn!(path = %rel, "Path already gone from disk; removing catalog entry");
                        record.is_directory
                    }
                    None => return Err(SyncError::NotFound(rel)),
                }
            }
            Err(err) => return Err(err.into()),
        };

        let mut removed = self.db().delete_by_path(&rel).await?;
        if is_directory {
            removed += self.db().delete_by_path_prefix(&rel).await?;
            self.cache().invalidate_subtree(&rel);
        } else {
            self.cache().invalidate_path(&rel);
        }

        info!(path = %rel, directory = is_directory, removed, "Deleted path");
        Ok(removed)
    }

    /// Rename `path` within its parent directory to `new_name`.
    ///
    /// The parent is rescanned before returning, so the old entry is gone
    /// from the catalog and the new one present. A renamed directory's
    /// contents are catalogued by a recursive scan in the background.
    pub async fn rename_path(&self, path: &str, new_name: &str) -> Result<RenameOutcome> {
        let old_rel = paths::normalize(path)?;
        if old_rel.is_empty() {
            return Err(SyncError::invalid_path("cannot rename the mirrored root"));
        }
        if !paths::is_valid_name(new_name) {
            return Err(SyncError::invalid_path(format!(
                "'{new_name}' is not a valid file name"
            )));
        }

        let parent = paths::parent_of(&old_rel).to_string();
        let new_rel = paths::join(&parent, new_name);
        if new_rel == old_rel {
            return Ok(RenameOutcome {
                new_path: new_rel,
                subtree_scan: None,
            });
        }

        let old_fs = paths::to_fs_path(self.root(), &old_rel);
        let new_fs = paths::to_fs_path(self.root(), &new_rel);
        let meta = match tokio::fs::symlink_metadata(&old_fs).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(SyncError::NotFound(old_rel));
            }
            Err(err) => return Err(err.into()),
        };
        if tokio::fs::try_exists(&new_fs).await? {
            return Err(SyncError::AlreadyExists(new_rel));
        }

        tokio::fs::rename(&old_fs, &new_fs).await?;
        info!(from = %old_rel, to = %new_rel, "Renamed path");

        self.inner
            .scan_tree(parent, ScanDepth::Single, &CancellationToken::new())
            .await?;

        let subtree_scan = meta
            .is_dir()
            .then(|| self.spawn_directory_scan(new_rel.clone(), ScanDepth::Recursive));

        Ok(RenameOutcome {
            new_path: new_rel,
            subtree_scan,
        })
    }
}
