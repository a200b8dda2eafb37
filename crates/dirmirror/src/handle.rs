//! Completion handles and cooperative cancellation for triggered scans.

use crate::error::{Result, SyncError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Token for cooperative cancellation of a scan.
///
/// Clone is cheap and shares state. Walks check it between entries and the
/// coordinator checks it between batches; a cancelled directory scan never
/// reconciles.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// What kind of scan a report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Full,
    Directory,
}

/// Counters from a finished scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub kind: ScanKind,
    /// Catalog path the scan started from (`""` for the root)
    pub path: String,
    /// Entries observed on disk
    pub entries_seen: u64,
    /// Entries the walker had to skip (stat/read failures)
    pub entries_skipped: u64,
    /// Records written to the catalog
    pub records_upserted: u64,
    /// Records written only after the overwrite retry
    pub records_retried: u64,
    /// Records that failed both upsert attempts
    pub records_skipped: u64,
    /// Records removed by reconciliation (including cascaded descendants)
    pub records_deleted: u64,
    /// Directories listed (1 for a plain directory scan)
    pub directories_scanned: u64,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn new(kind: ScanKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            entries_seen: 0,
            entries_skipped: 0,
            records_upserted: 0,
            records_retried: 0,
            records_skipped: 0,
            records_deleted: 0,
            directories_scanned: 0,
            cancelled: false,
            duration_ms: 0,
        }
    }

    /// Fold a sub-scan's counters into this report.
    pub fn absorb(&mut self, other: &ScanReport) {
        self.entries_seen += other.entries_seen;
        self.entries_skipped += other.entries_skipped;
        self.records_upserted += other.records_upserted;
        self.records_retried += other.records_retried;
        self.records_skipped += other.records_skipped;
        self.records_deleted += other.records_deleted;
        self.directories_scanned += other.directories_scanned;
        self.cancelled |= other.cancelled;
    }
}

/// Handle to a scan running in the background.
///
/// Dropping the handle detaches the scan; it keeps running to completion.
#[derive(Debug)]
pub struct ScanHandle {
    join: JoinHandle<Result<ScanReport>>,
    cancel: CancellationToken,
}

impl ScanHandle {
    pub(crate) fn new(join: JoinHandle<Result<ScanReport>>, cancel: CancellationToken) -> Self {
        Self { join, cancel }
    }

    /// Ask the scan to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the scan to finish.
    pub async fn wait(self) -> Result<ScanReport> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::TaskFailed(e.to_string())),
        }
    }
}
