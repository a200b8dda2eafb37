use super::Inner;
use crate::error::{Result, SyncError};
use crate::handle::{CancellationToken, ScanKind, ScanReport};
use crate::paths;
use crate::walker::{WalkEvent, WalkMode};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{info, warn};

impl Inner {
    /// Walk the whole root and upsert everything seen.
    ///
    /// Never deletes. Batches committed before an error stay committed.
    pub(super) async fn full_scan(&self, cancel: &CancellationToken) -> Result<ScanReport> {
        let start = Instant::now();
        self.full_scans_started.fetch_add(1, Ordering::SeqCst);
        info!(root = %self.root.display(), "Starting full scan");

        let mut report = ScanReport::new(ScanKind::Full, "");
        let mut batch = Vec::with_capacity(self.config.batch_size);
        let progress_interval = self.config.progress_interval.max(1) as u64;
        let mut finished = false;

        let mut stream = self
            .walker
            .walk(self.root.clone(), WalkMode::Full, cancel.clone());
        while let Some(event) = stream.next().await {
            match event {
                WalkEvent::Entry(observation) => {
                    let full_path = observation.rel_path.clone();
                    let parent_path = paths::parent_of(&full_path).to_string();
                    batch.push(observation.into_record(full_path, parent_path));
                    report.entries_seen += 1;

                    if batch.len() >= self.config.batch_size {
                        self.flush_batch(&mut batch, &mut report).await?;
                    }
                    if report.entries_seen % progress_interval == 0 {
                        info!(
                            scanned = report.entries_seen,
                            upserted = report.records_upserted,
                            "Full scan progress"
                        );
                    }
                }
                WalkEvent::RootFailed { message, .. } => {
                    return Err(SyncError::RootUnreadable {
                        path: self.root.display().to_string(),
                        message,
                    });
                }
                WalkEvent::Done(summary) => {
                    report.entries_skipped = summary.skipped;
                    report.directories_scanned = summary.directories;
                    report.cancelled = summary.cancelled;
                    finished = true;
                }
            }
        }
        self.flush_batch(&mut batch, &mut report).await?;

        if !finished {
            return Err(SyncError::TaskFailed(
                "full scan walk ended without a summary".to_string(),
            ));
        }

        report.cancelled |= cancel.is_cancelled();
        report.duration_ms = start.elapsed().as_millis() as u64;

        if report.cancelled {
            warn!(
                scanned = report.entries_seen,
                upserted = report.records_upserted,
                "Full scan cancelled; initial scan not marked complete"
            );
            return Ok(report);
        }

        self.db.mark_initial_scan_completed().await?;
        info!(
            scanned = report.entries_seen,
            upserted = report.records_upserted,
            skipped = report.entries_skipped + report.records_skipped,
            duration_ms = report.duration_ms,
            "Full scan completed"
        );
        Ok(report)
    }
}
