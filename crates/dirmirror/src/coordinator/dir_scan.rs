use super::Inner;
use crate::error::{Result, SyncError};
use crate::handle::{CancellationToken, ScanKind, ScanReport};
use crate::paths;
use crate::walker::{WalkEvent, WalkMode};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// How far a directory scan descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDepth {
    /// The directory's immediate children only
    #[default]
    Single,
    /// The directory and every subdirectory, each reconciled on its own
    Recursive,
}

/// Result of listing and reconciling one directory.
struct DirOutcome {
    report: ScanReport,
    subdirectories: Vec<String>,
}

impl Inner {
    /// Scan `dir`, and with [`ScanDepth::Recursive`] every directory below it.
    ///
    /// Subdirectories are scanned by at most `max_concurrent_dir_scans`
    /// workers. A failure on `dir` itself is returned; failures below it are
    /// logged and the rest of the tree is still scanned.
    pub(super) async fn scan_tree(
        self: &Arc<Self>,
        dir: String,
        depth: ScanDepth,
        cancel: &CancellationToken,
    ) -> Result<ScanReport> {
        let start = Instant::now();
        let first = self.scan_one(&dir, cancel).await?;
        let mut report = first.report;
        report.path = dir.clone();

        if depth == ScanDepth::Recursive {
            let mut queue: VecDeque<String> = first.subdirectories.into();
            let mut workers = JoinSet::new();
            let limit = self.config.max_concurrent_dir_scans;
            let mut failed = 0u64;

            loop {
                while workers.len() < limit && !cancel.is_cancelled() {
                    let Some(next) = queue.pop_front() else { break };
                    let inner = Arc::clone(self);
                    let token = cancel.clone();
                    workers.spawn(async move {
                        let result = inner.scan_one(&next, &token).await;
                        (next, result)
                    });
                }
                let Some(joined) = workers.join_next().await else { break };
                match joined {
                    Ok((_, Ok(outcome))) => {
                        report.absorb(&outcome.report);
                        queue.extend(outcome.subdirectories);
                    }
                    Ok((path, Err(err))) => {
                        failed += 1;
                        warn!(path = %path, error = %err, "Directory scan failed; continuing with siblings");
                    }
                    Err(err) => {
                        failed += 1;
                        warn!(error = %err, "Directory scan worker panicked");
                    }
                }
            }

            report.cancelled |= cancel.is_cancelled();
            if failed > 0 {
                warn!(path = %dir, failed, "Recursive scan finished with failures");
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            path = %dir,
            directories = report.directories_scanned,
            upserted = report.records_upserted,
            deleted = report.records_deleted,
            cancelled = report.cancelled,
            duration_ms = report.duration_ms,
            "Directory scan completed"
        );
        Ok(report)
    }

    /// List `dir`, upsert its children, then drop catalog children not seen.
    ///
    /// Reconciliation runs only after every upsert has been attempted and
    /// only when the listing was complete. A cancelled walk leaves existing
    /// records alone; a failed batch transaction returns the error before
    /// anything is deleted. Rows skipped inside a batch were still observed,
    /// so reconciliation never removes them.
    async fn scan_one(&self, dir: &str, cancel: &CancellationToken) -> Result<DirOutcome> {
        let mut report = ScanReport::new(ScanKind::Directory, dir);
        let mut observed = HashSet::new();
        let mut subdirectories = Vec::new();
        let mut batch = Vec::with_capacity(self.config.batch_size);
        let mut complete = false;

        let fs_path = paths::to_fs_path(&self.root, dir);
        let mut stream = self.walker.walk(fs_path, WalkMode::Shallow, cancel.clone());
        while let Some(event) = stream.next().await {
            match event {
                WalkEvent::Entry(observation) => {
                    let full_path = paths::join(dir, &observation.name);
                    if observation.is_directory {
                        subdirectories.push(full_path.clone());
                    }
                    observed.insert(full_path.clone());
                    batch.push(observation.into_record(full_path, dir.to_string()));
                    report.entries_seen += 1;

                    if batch.len() >= self.config.batch_size {
                        self.flush_batch(&mut batch, &mut report).await?;
                    }
                }
                WalkEvent::RootFailed {
                    kind: io::ErrorKind::NotFound,
                    ..
                } if !dir.is_empty() => {
                    return self.purge_vanished(dir, report).await;
                }
                WalkEvent::RootFailed { message, .. } => {
                    return Err(SyncError::RootUnreadable {
                        path: dir.to_string(),
                        message,
                    });
                }
                WalkEvent::Done(summary) => {
                    report.entries_skipped = summary.skipped;
                    report.cancelled = summary.cancelled;
                    complete = !summary.cancelled;
                }
            }
        }
        self.flush_batch(&mut batch, &mut report).await?;
        report.directories_scanned = 1;

        if !complete || cancel.is_cancelled() {
            report.cancelled = true;
            warn!(path = %dir, "Directory scan interrupted; skipping reconciliation");
            return Ok(DirOutcome {
                report,
                subdirectories: Vec::new(),
            });
        }
        if report.records_skipped > 0 {
            warn!(
                path = %dir,
                skipped = report.records_skipped,
                "Some children failed to upsert; their existing records are kept"
            );
        }

        let existing = self.db.find_by_parent(dir).await?;
        for stale in existing
            .into_iter()
            .filter(|record| !observed.contains(&record.full_path))
        {
            let removed = if stale.is_directory {
                let removed = self.db.delete_tree(&stale.full_path).await?;
                self.cache.invalidate_subtree(&stale.full_path);
                removed
            } else {
                let removed = self.db.delete_by_path(&stale.full_path).await?;
                self.cache.invalidate_path(&stale.full_path);
                removed
            };
            debug!(path = %stale.full_path, removed, "Removed entry no longer on disk");
            report.records_deleted += removed;
        }
        self.cache.invalidate_path(dir);

        Ok(DirOutcome {
            report,
            subdirectories,
        })
    }

    /// The scanned directory no longer exists: drop it and everything below.
    async fn purge_vanished(&self, dir: &str, mut report: ScanReport) -> Result<DirOutcome> {
        let removed = self.db.delete_tree(dir).await?;
        self.cache.invalidate_subtree(dir);
        report.records_deleted = removed;
        info!(path = %dir, removed, "Scanned directory is gone; removed it from the catalog");
        Ok(DirOutcome {
            report,
            subdirectories: Vec::new(),
        })
    }
}
