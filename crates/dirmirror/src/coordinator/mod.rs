//! Sync coordinator
//!
//! Owns the catalog writes. Three kinds of work flow through here:
//!
//! - **Full scans** walk the whole root and upsert in batches. They never
//!   delete. At most one runs per coordinator; a trigger while one is running
//!   is ignored.
//! - **Directory scans** list one directory, upsert its children, then
//!   delete catalog children that were not observed. Any number may run at
//!   once; recursive scans fan out through a bounded worker set.
//! - **User mutations** (delete, rename) change the filesystem first and
//!   then fix the catalog directly or through a directory scan.
//!
//! Every catalog mutation invalidates the affected listings in the cache.

mod dir_scan;
mod full_scan;
mod mutate;

pub use dir_scan::ScanDepth;
pub use mutate::RenameOutcome;

use crate::cache::CacheGateway;
use crate::config::MirrorConfig;
use crate::error::Result;
use crate::handle::{CancellationToken, ScanHandle, ScanReport};
use crate::paths;
use crate::walker::TreeWalker;
use dirmirror_db::{CatalogDb, DbConfig, PathRecord};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entry point for everything that reads or writes the catalog.
///
/// Clone is cheap; clones share the same single-flight guard.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    root: PathBuf,
    db: CatalogDb,
    cache: CacheGateway,
    walker: TreeWalker,
    config: MirrorConfig,
    full_scan_running: AtomicBool,
    full_scans_started: AtomicU64,
}

/// Holds the full-scan flag; releasing happens on drop, including unwinds.
struct FullScanGuard {
    inner: Arc<Inner>,
}

impl FullScanGuard {
    fn try_acquire(inner: &Arc<Inner>) -> Option<Self> {
        inner
            .full_scan_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            inner: Arc::clone(inner),
        })
    }
}

impl Drop for FullScanGuard {
    fn drop(&mut self) {
        self.inner.full_scan_running.store(false, Ordering::Release);
    }
}

impl SyncCoordinator {
    /// Build a coordinator over an existing catalog and cache.
    pub fn new(config: MirrorConfig, db: CatalogDb, cache: CacheGateway) -> Result<Self> {
        config.validate()?;
        let walker = TreeWalker::new(config.follow_symlinks, config.hash_size_ceiling);
        Ok(Self {
            inner: Arc::new(Inner {
                root: config.root_dir.clone(),
                db,
                cache,
                walker,
                config,
                full_scan_running: AtomicBool::new(false),
                full_scans_started: AtomicU64::new(0),
            }),
        })
    }

    /// Connect to `config.database_url` and use an in-process listing cache.
    pub async fn open(config: MirrorConfig) -> Result<Self> {
        let db = CatalogDb::connect(&DbConfig::from_url(config.database_url.clone())?).await?;
        let cache = CacheGateway::in_memory(config.cache_max_entries, config.cache_ttl());
        Self::new(config, db, cache)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.inner.config
    }

    pub fn db(&self) -> &CatalogDb {
        &self.inner.db
    }

    pub fn cache(&self) -> &CacheGateway {
        &self.inner.cache
    }

    pub fn is_full_scan_running(&self) -> bool {
        self.inner.full_scan_running.load(Ordering::Acquire)
    }

    /// Number of full walks actually started by this coordinator.
    pub fn full_scans_started(&self) -> u64 {
        self.inner.full_scans_started.load(Ordering::SeqCst)
    }

    /// Start a full scan in the background.
    ///
    /// Returns `None` without doing anything if a full scan is already
    /// running on this coordinator.
    pub fn trigger_full_scan(&self) -> Option<ScanHandle> {
        let Some(guard) = FullScanGuard::try_acquire(&self.inner) else {
            debug!("Full scan already running; trigger ignored");
            return None;
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(async move {
            let _guard = guard;
            inner.full_scan(&token).await
        });
        Some(ScanHandle::new(join, cancel))
    }

    /// Run a full scan and wait for it. `Ok(None)` if one was already running.
    pub async fn run_full_scan(&self) -> Result<Option<ScanReport>> {
        match self.trigger_full_scan() {
            Some(handle) => handle.wait().await.map(Some),
            None => Ok(None),
        }
    }

    /// Start a single-directory scan in the background.
    pub fn trigger_directory_scan(&self, path: &str) -> Result<ScanHandle> {
        self.trigger_directory_scan_with(path, ScanDepth::Single)
    }

    pub fn trigger_directory_scan_with(&self, path: &str, depth: ScanDepth) -> Result<ScanHandle> {
        let dir = paths::normalize(path)?;
        Ok(self.spawn_directory_scan(dir, depth))
    }

    /// Scan a directory and wait for it, reconciling its children.
    pub async fn scan_directory(&self, path: &str, depth: ScanDepth) -> Result<ScanReport> {
        let dir = paths::normalize(path)?;
        self.inner
            .scan_tree(dir, depth, &CancellationToken::new())
            .await
    }

    fn spawn_directory_scan(&self, dir: String, depth: ScanDepth) -> ScanHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let inner = Arc::clone(&self.inner);
        let join = tokio::spawn(async move { inner.scan_tree(dir, depth, &token).await });
        ScanHandle::new(join, cancel)
    }

    /// Children of a directory, from the cache when possible.
    ///
    /// A store failure is returned as an error, never as an empty listing.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<PathRecord>> {
        let dir = paths::normalize(path)?;
        if let Some(hit) = self.inner.cache.get_listing(&dir) {
            return Ok(hit);
        }

        let generation = self.inner.cache.generation();
        let records = self.inner.db.find_by_parent(&dir).await?;
        self.inner
            .cache
            .put_listing_if_current(&dir, &records, generation);

        if self.inner.config.refresh_on_miss {
            debug!(path = %dir, "Listing cache miss; refreshing directory in background");
            drop(self.spawn_refresh(dir));
        }
        Ok(records)
    }

    /// Rescan one directory in the background, logging instead of returning
    /// any failure since nobody waits on the result.
    fn spawn_refresh(&self, dir: String) -> tokio::task::JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let cancel = CancellationToken::new();
            if let Err(err) = inner.scan_tree(dir.clone(), ScanDepth::Single, &cancel).await {
                warn!(path = %dir, error = %err, "Background directory refresh failed");
            }
        })
    }

    /// Case-insensitive name search across the catalog.
    pub async fn search(&self, substring: &str, limit: usize) -> Result<Vec<PathRecord>> {
        Ok(self.inner.db.find_by_name_contains(substring, limit).await?)
    }

    /// Startup hook: trigger a full scan unless one has completed before.
    pub async fn bootstrap(&self) -> Result<Option<ScanHandle>> {
        if self.inner.db.initial_scan_completed().await? {
            info!(root = %self.inner.root.display(), "Catalog already initialized; skipping startup scan");
            return Ok(None);
        }
        info!(root = %self.inner.root.display(), "No completed full scan on record; starting one");
        Ok(self.trigger_full_scan())
    }
}

impl Inner {
    /// Upsert and clear `batch`, then invalidate listings it touched.
    async fn flush_batch(
        &self,
        batch: &mut Vec<PathRecord>,
        report: &mut ScanReport,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let records = std::mem::replace(batch, Vec::with_capacity(self.config.batch_size));
        let result = self.db.upsert_batch(&records).await?;
        report.records_upserted += result.upserted;
        report.records_retried += result.retried;
        report.records_skipped += result.skipped;

        for record in &records {
            self.cache.invalidate_path(&record.full_path);
        }
        Ok(())
    }
}
