//! dirmirror - Filesystem Catalog Synchronization
//!
//! Keeps a queryable catalog of a directory tree in step with the disk, and
//! serves directory listings through a short-lived cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌─────────────┐
//! │ TreeWalker  │────▶│ SyncCoordinator  │────▶│  CatalogDb  │
//! │ (blocking   │     │ (full scans,     │     │  (SQLite)   │
//! │  walk)      │     │  dir scans,      │     └─────────────┘
//! └─────────────┘     │  delete/rename)  │     ┌─────────────┐
//!                     │                  │────▶│CacheGateway │
//!                     └──────────────────┘     │ (listings)  │
//!                                              └─────────────┘
//! ```
//!
//! # Core Concepts
//!
//! - **Catalog path**: path relative to the mirrored root, `/`-separated; the
//!   root is `""`
//! - **Full scan**: walks everything, upserts, never deletes; single-flight
//! - **Directory scan**: lists one directory and removes catalog children
//!   that are no longer on disk
//! - **Listing cache**: `dir:v1:<path>` entries, invalidated on every write

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod paths;
pub mod walker;

pub use cache::{CacheGateway, CacheStats, ListingCache, MokaListingCache};
pub use config::MirrorConfig;
pub use coordinator::{RenameOutcome, ScanDepth, SyncCoordinator};
pub use dirmirror_db::{CatalogDb, PathRecord};
pub use error::{Result, SyncError};
pub use handle::{CancellationToken, ScanHandle, ScanKind, ScanReport};
pub use walker::{TreeWalker, WalkEvent, WalkMode, WalkSummary};
