//! Tree walker
//!
//! Walks a directory on a blocking thread and streams one [`Observation`] per
//! entry through a bounded channel, so consumers pull entries lazily and a
//! slow database applies backpressure to the walk.
//!
//! - The walk root itself is never reported.
//! - Entries that fail stat are logged and skipped; the walk continues.
//! - Failing to read the walk root is reported as [`WalkEvent::RootFailed`]
//!   so callers can tell "empty directory" from "directory not listed".
//! - Content hashes are computed in [`WalkMode::Full`] only, for regular
//!   files smaller than the configured ceiling.

use crate::handle::CancellationToken;
use crate::paths;
use chrono::{DateTime, Utc};
use dirmirror_db::PathRecord;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Entries buffered between the walk thread and its consumer
const CHANNEL_CAPACITY: usize = 1024;

/// How far below the walk root to go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Every descendant
    Full,
    /// Immediate children only
    Shallow,
}

/// Metadata for one entry seen on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Path relative to the walk root, `/`-separated
    pub rel_path: String,
    pub name: String,
    pub is_directory: bool,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub content_hash: Option<String>,
}

impl Observation {
    /// Build the catalog record for this entry at `full_path`.
    pub fn into_record(self, full_path: String, parent_path: String) -> PathRecord {
        let extension = if self.is_directory {
            String::new()
        } else {
            paths::extension_of(&self.name)
        };
        PathRecord {
            full_path,
            parent_path,
            name: self.name,
            is_directory: self.is_directory,
            size_bytes: if self.is_directory { 0 } else { self.size_bytes },
            modified_at: self.modified_at,
            extension,
            content_hash: self.content_hash,
            updated_at: Utc::now(),
        }
    }
}

/// Totals reported when a walk ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub entries: u64,
    pub directories: u64,
    pub skipped: u64,
    pub bytes: u64,
    pub hashed: u64,
    pub cancelled: bool,
}

/// Items produced by a walk, always terminated by `Done` or `RootFailed`.
#[derive(Debug)]
pub enum WalkEvent {
    Entry(Observation),
    RootFailed { kind: io::ErrorKind, message: String },
    Done(WalkSummary),
}

/// Receiving end of a running walk.
pub struct WalkStream {
    rx: mpsc::Receiver<WalkEvent>,
}

impl WalkStream {
    /// Next event, or `None` once the walk thread has finished.
    pub async fn next(&mut self) -> Option<WalkEvent> {
        self.rx.recv().await
    }
}

/// Filesystem walker configuration.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    follow_symlinks: bool,
    hash_size_ceiling: u64,
}

impl TreeWalker {
    pub fn new(follow_symlinks: bool, hash_size_ceiling: u64) -> Self {
        Self {
            follow_symlinks,
            hash_size_ceiling,
        }
    }

    /// Start walking `root` on a blocking thread.
    ///
    /// Dropping the returned stream stops the walk at the next entry.
    pub fn walk(&self, root: PathBuf, mode: WalkMode, cancel: CancellationToken) -> WalkStream {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let walker = self.clone();
        tokio::task::spawn_blocking(move || walker.walk_blocking(&root, mode, &cancel, &tx));
        WalkStream { rx }
    }

    fn walk_blocking(
        &self,
        root: &Path,
        mode: WalkMode,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<WalkEvent>,
    ) {
        let mut summary = WalkSummary::default();
        let mut walk = WalkDir::new(root).follow_links(self.follow_symlinks);
        if mode == WalkMode::Shallow {
            walk = walk.max_depth(1);
        }

        for entry in walk {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    let kind = err.io_error().map(|e| e.kind()).unwrap_or(io::ErrorKind::Other);
                    let _ = tx.blocking_send(WalkEvent::RootFailed {
                        kind,
                        message: err.to_string(),
                    });
                    return;
                }
                Err(err) => {
                    warn!(
                        path = ?err.path(),
                        error = %err,
                        "Skipping unreadable entry"
                    );
                    summary.skipped += 1;
                    continue;
                }
            };

            if entry.depth() == 0 {
                if !entry.file_type().is_dir() {
                    let _ = tx.blocking_send(WalkEvent::RootFailed {
                        kind: io::ErrorKind::Other,
                        message: format!("{} is not a directory", root.display()),
                    });
                    return;
                }
                continue;
            }

            if !self.follow_symlinks && entry.path_is_symlink() {
                debug!(path = %entry.path().display(), "Skipping symlink");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    warn!(path = %entry.path().display(), error = %err, "Skipping entry that failed stat");
                    summary.skipped += 1;
                    continue;
                }
            };

            let Some(rel_path) = paths::relative_slash_path(root, entry.path()) else {
                summary.skipped += 1;
                continue;
            };

            let is_directory = metadata.is_dir();
            let size_bytes = if is_directory { 0 } else { metadata.len() };
            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();

            let content_hash = if mode == WalkMode::Full
                && metadata.is_file()
                && size_bytes < self.hash_size_ceiling
            {
                hash_file(entry.path())
            } else {
                None
            };

            summary.entries += 1;
            summary.bytes += size_bytes;
            if is_directory {
                summary.directories += 1;
            }
            if content_hash.is_some() {
                summary.hashed += 1;
            }

            let observation = Observation {
                rel_path,
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory,
                size_bytes,
                modified_at,
                content_hash,
            };

            if tx.blocking_send(WalkEvent::Entry(observation)).is_err() {
                // Consumer went away
                return;
            }
        }

        let _ = tx.blocking_send(WalkEvent::Done(summary));
    }
}

/// SHA-256 of a file's contents as lowercase hex; `None` if it can't be read.
fn hash_file(path: &Path) -> Option<String> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "Hash skipped: open failed");
            return None;
        }
    };
    let mut hasher = Sha256::new();
    if let Err(err) = io::copy(&mut file, &mut hasher) {
        debug!(path = %path.display(), error = %err, "Hash skipped: read failed");
        return None;
    }
    Some(hex::encode(hasher.finalize()))
}
