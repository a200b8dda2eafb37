//! End-to-end tests for the sync engine
//!
//! Each test builds a scratch tree and a file-backed catalog under a temp
//! directory and drives the coordinator the way the CLI does.

use dirmirror::{
    CatalogDb, MirrorConfig, PathRecord, ScanDepth, SyncCoordinator, SyncError,
};
use filetime::{set_file_mtime, FileTime};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// Scratch tree plus catalog location (cleaned up on drop)
struct TestEnv {
    _temp: TempDir,
    pub root: PathBuf,
    pub db_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("data");
        let db_path = temp.path().join("catalog.sqlite3");
        fs::create_dir_all(&root).expect("Failed to create root dir");
        Self {
            _temp: temp,
            root,
            db_path,
        }
    }

    fn config(&self) -> MirrorConfig {
        let mut config = MirrorConfig::for_root(&self.root);
        config.database_url = self.db_path.to_string_lossy().to_string();
        config.refresh_on_miss = false;
        config.max_concurrent_dir_scans = 4;
        config
    }

    async fn coordinator(&self) -> SyncCoordinator {
        SyncCoordinator::open(self.config())
            .await
            .expect("Failed to open coordinator")
    }

    fn write_file(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.root.join(rel)).unwrap();
    }
}

fn names(records: &[PathRecord]) -> Vec<String> {
    records.iter().map(|r| r.name.clone()).collect()
}

async fn catalog_paths(db: &CatalogDb, parent: &str) -> BTreeSet<String> {
    db.find_by_parent(parent)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.full_path)
        .collect()
}

// ============================================================================
// Full scans
// ============================================================================

#[tokio::test]
async fn test_full_scan_catalogs_whole_tree() {
    let env = TestEnv::new();
    env.write_file("hello.txt", b"hello");
    env.write_file("movies/Clip.MP4", &[0u8; 100]);
    env.write_file("movies/b/notes.md", b"# notes");

    let coordinator = env.coordinator().await;
    let report = coordinator.run_full_scan().await.unwrap().unwrap();

    assert_eq!(report.entries_seen, 5);
    assert_eq!(report.records_upserted, 5);
    assert!(!report.cancelled);
    assert_eq!(coordinator.db().count().await.unwrap(), 5);

    let hello = coordinator.db().get("hello.txt").await.unwrap().unwrap();
    assert_eq!(hello.parent_path, "");
    assert_eq!(hello.extension, ".txt");
    assert_eq!(hello.size_bytes, 5);
    assert_eq!(
        hello.content_hash.as_deref(),
        Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
    );

    let clip = coordinator.db().get("movies/Clip.MP4").await.unwrap().unwrap();
    assert_eq!(clip.parent_path, "movies");
    assert_eq!(clip.extension, ".mp4");

    let dir = coordinator.db().get("movies/b").await.unwrap().unwrap();
    assert!(dir.is_directory);
    assert_eq!(dir.size_bytes, 0);
    assert_eq!(dir.extension, "");

    assert!(coordinator.db().initial_scan_completed().await.unwrap());
}

#[tokio::test]
async fn test_full_scan_records_modification_time() {
    let env = TestEnv::new();
    let path = env.write_file("old.log", b"x");
    set_file_mtime(&path, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    let record = coordinator.db().get("old.log").await.unwrap().unwrap();
    assert_eq!(record.modified_at.timestamp(), 1_600_000_000);
}

#[tokio::test]
async fn test_full_scan_never_removes_records() {
    let env = TestEnv::new();
    let path = env.write_file("movies/a.mp4", b"a");

    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();
    fs::remove_file(path).unwrap();
    coordinator.run_full_scan().await.unwrap();

    assert!(coordinator.db().get("movies/a.mp4").await.unwrap().is_some());
}

#[tokio::test]
async fn test_concurrent_full_scan_triggers_run_one_walk() {
    let env = TestEnv::new();
    for i in 0..20 {
        env.write_file(&format!("dir{}/file{}.bin", i % 4, i), b"payload");
    }
    let coordinator = env.coordinator().await;

    let first = coordinator.trigger_full_scan();
    let second = coordinator.trigger_full_scan();
    assert!(first.is_some());
    assert!(second.is_none());
    assert!(coordinator.is_full_scan_running());

    let report = first.unwrap().wait().await.unwrap();
    assert_eq!(coordinator.full_scans_started(), 1);
    assert_eq!(report.entries_seen, 24);
    assert_eq!(coordinator.db().count().await.unwrap(), 24);

    // The guard is released once the scan finishes.
    assert!(!coordinator.is_full_scan_running());
    assert!(coordinator.run_full_scan().await.unwrap().is_some());
    assert_eq!(coordinator.full_scans_started(), 2);
}

#[tokio::test]
async fn test_racing_awaited_full_scans_share_one_walk() {
    let env = TestEnv::new();
    env.write_file("a/b/c.txt", b"c");
    let coordinator = env.coordinator().await;
    let other = coordinator.clone();

    let (left, right) = tokio::join!(coordinator.run_full_scan(), other.run_full_scan());
    let ran: Vec<_> = [left.unwrap(), right.unwrap()]
        .into_iter()
        .flatten()
        .collect();

    assert_eq!(ran.len(), 1);
    assert_eq!(coordinator.full_scans_started(), 1);
    assert_eq!(coordinator.db().count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_full_scan_of_missing_root_fails() {
    let env = TestEnv::new();
    let mut config = env.config();
    config.root_dir = env.root.join("does-not-exist");
    let coordinator = SyncCoordinator::open(config).await.unwrap();

    let result = coordinator.run_full_scan().await;
    assert!(matches!(result, Err(SyncError::RootUnreadable { .. })));
    assert!(!coordinator.db().initial_scan_completed().await.unwrap());
    assert!(!coordinator.is_full_scan_running());
}

// ============================================================================
// Directory scans
// ============================================================================

#[tokio::test]
async fn test_movies_directory_reconciliation() {
    let env = TestEnv::new();
    let clip = env.write_file("movies/a.mp4", &[7u8; 100]);
    env.mkdir("movies/b");
    let coordinator = env.coordinator().await;

    coordinator
        .scan_directory("/movies", ScanDepth::Single)
        .await
        .unwrap();
    let records = coordinator.db().find_by_parent("movies").await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.parent_path == "movies"));
    let a = records.iter().find(|r| r.name == "a.mp4").unwrap();
    assert_eq!(a.size_bytes, 100);
    assert!(!a.is_directory);
    assert!(records.iter().any(|r| r.name == "b" && r.is_directory));

    fs::remove_file(clip).unwrap();
    let report = coordinator
        .scan_directory("movies", ScanDepth::Single)
        .await
        .unwrap();
    assert_eq!(report.records_deleted, 1);

    let records = coordinator.db().find_by_parent("movies").await.unwrap();
    assert_eq!(names(&records), vec!["b".to_string()]);
}

#[tokio::test]
async fn test_rejected_row_does_not_block_reconciliation() {
    let env = TestEnv::new();
    let gone = env.write_file("movies/gone.mp4", b"g");
    let coordinator = env.coordinator().await;
    coordinator.scan_directory("movies", ScanDepth::Single).await.unwrap();

    sqlx::query(
        "CREATE TRIGGER reject_bad BEFORE INSERT ON path_records \
         WHEN NEW.name = 'bad.mp4' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(coordinator.db().pool())
    .await
    .unwrap();

    fs::remove_file(gone).unwrap();
    env.write_file("movies/bad.mp4", b"b");
    env.write_file("movies/new.mp4", b"n");
    let report = coordinator
        .scan_directory("movies", ScanDepth::Single)
        .await
        .unwrap();

    assert_eq!(report.records_retried, 1);
    assert_eq!(report.records_skipped, 1);
    assert_eq!(report.records_deleted, 1);
    assert_eq!(
        catalog_paths(coordinator.db(), "movies").await,
        BTreeSet::from(["movies/new.mp4".to_string()])
    );
}

#[tokio::test]
async fn test_directory_scan_is_idempotent() {
    let env = TestEnv::new();
    env.write_file("docs/one.txt", b"1");
    env.write_file("docs/two.txt", b"22");
    env.mkdir("docs/sub");
    let coordinator = env.coordinator().await;

    coordinator.scan_directory("docs", ScanDepth::Single).await.unwrap();
    let before = coordinator.db().find_by_parent("docs").await.unwrap();
    let report = coordinator.scan_directory("docs", ScanDepth::Single).await.unwrap();
    let after = coordinator.db().find_by_parent("docs").await.unwrap();

    assert_eq!(report.records_deleted, 0);
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.full_path, a.full_path);
        assert_eq!(b.size_bytes, a.size_bytes);
        assert_eq!(b.modified_at, a.modified_at);
        assert_eq!(b.is_directory, a.is_directory);
    }
}

#[tokio::test]
async fn test_directory_scan_picks_up_changes() {
    let env = TestEnv::new();
    let path = env.write_file("docs/grow.txt", b"1");
    let coordinator = env.coordinator().await;
    coordinator.scan_directory("docs", ScanDepth::Single).await.unwrap();

    fs::write(&path, b"12345").unwrap();
    env.write_file("docs/new.txt", b"n");
    coordinator.scan_directory("docs", ScanDepth::Single).await.unwrap();

    let grown = coordinator.db().get("docs/grow.txt").await.unwrap().unwrap();
    assert_eq!(grown.size_bytes, 5);
    assert!(coordinator.db().get("docs/new.txt").await.unwrap().is_some());
}

#[tokio::test]
async fn test_reconciliation_cascades_to_removed_subtree() {
    let env = TestEnv::new();
    env.write_file("movies/keep.mp4", b"k");
    env.write_file("movies/b/c/deep.txt", b"d");
    env.write_file("movies/bb/neighbor.txt", b"n");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();
    assert_eq!(coordinator.db().count().await.unwrap(), 7);

    fs::remove_dir_all(env.root.join("movies/b")).unwrap();
    let report = coordinator
        .scan_directory("movies", ScanDepth::Single)
        .await
        .unwrap();

    assert_eq!(report.records_deleted, 3);
    assert!(coordinator.db().get("movies/b").await.unwrap().is_none());
    assert!(coordinator.db().get("movies/b/c").await.unwrap().is_none());
    assert!(coordinator.db().get("movies/b/c/deep.txt").await.unwrap().is_none());
    assert!(coordinator.db().get("movies/bb/neighbor.txt").await.unwrap().is_some());
    assert_eq!(coordinator.db().count().await.unwrap(), 4);
}

#[tokio::test]
async fn test_single_scan_leaves_deeper_levels_alone() {
    let env = TestEnv::new();
    let deep = env.write_file("top/mid/leaf.txt", b"l");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    fs::remove_file(deep).unwrap();
    coordinator.scan_directory("top", ScanDepth::Single).await.unwrap();
    assert!(coordinator.db().get("top/mid/leaf.txt").await.unwrap().is_some());

    coordinator.scan_directory("top/mid", ScanDepth::Single).await.unwrap();
    assert!(coordinator.db().get("top/mid/leaf.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_recursive_scan_reconciles_every_level() {
    let env = TestEnv::new();
    let a = env.write_file("r/a.txt", b"a");
    let b = env.write_file("r/x/b.txt", b"b");
    let c = env.write_file("r/x/y/c.txt", b"c");
    env.write_file("r/x/y/z/d.txt", b"d");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    for path in [a, b, c] {
        fs::remove_file(path).unwrap();
    }
    env.write_file("r/x/y/z/e.txt", b"e");

    let report = coordinator
        .scan_directory("", ScanDepth::Recursive)
        .await
        .unwrap();

    assert_eq!(report.records_deleted, 3);
    assert_eq!(report.directories_scanned, 5);
    assert_eq!(
        catalog_paths(coordinator.db(), "r/x/y/z").await,
        BTreeSet::from(["r/x/y/z/d.txt".to_string(), "r/x/y/z/e.txt".to_string()])
    );
    assert_eq!(
        catalog_paths(coordinator.db(), "r").await,
        BTreeSet::from(["r/x".to_string()])
    );
}

#[tokio::test]
async fn test_scan_of_vanished_directory_purges_it() {
    let env = TestEnv::new();
    env.write_file("gone/inner/file.txt", b"f");
    env.write_file("stay.txt", b"s");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    fs::remove_dir_all(env.root.join("gone")).unwrap();
    let report = coordinator.scan_directory("gone", ScanDepth::Single).await.unwrap();

    assert_eq!(report.records_deleted, 3);
    assert_eq!(coordinator.db().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_scan_of_file_fails_without_touching_catalog() {
    let env = TestEnv::new();
    env.write_file("movies/a.mp4", b"a");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    let result = coordinator
        .scan_directory("movies/a.mp4", ScanDepth::Single)
        .await;
    assert!(matches!(result, Err(SyncError::RootUnreadable { .. })));
    assert_eq!(coordinator.db().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_scan_rejects_paths_outside_root() {
    let env = TestEnv::new();
    let coordinator = env.coordinator().await;
    let result = coordinator.scan_directory("../etc", ScanDepth::Single).await;
    assert!(matches!(result, Err(SyncError::InvalidPath(_))));
}

#[tokio::test]
async fn test_triggered_directory_scan_completes() {
    let env = TestEnv::new();
    env.write_file("inbox/mail.eml", b"m");
    let coordinator = env.coordinator().await;

    let handle = coordinator.trigger_directory_scan("inbox").unwrap();
    let report = handle.wait().await.unwrap();

    assert_eq!(report.entries_seen, 1);
    assert!(coordinator.db().get("inbox/mail.eml").await.unwrap().is_some());
}

// ============================================================================
// Listings and cache
// ============================================================================

#[tokio::test]
async fn test_listing_is_served_from_cache() {
    let env = TestEnv::new();
    env.write_file("movies/a.mp4", b"a");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    let first = coordinator.list_directory("movies").await.unwrap();
    let second = coordinator.list_directory("/movies/").await.unwrap();
    assert_eq!(first, second);

    let stats = coordinator.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_root_aliases_list_the_same_directory() {
    let env = TestEnv::new();
    env.write_file("top.txt", b"t");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    for alias in ["", "/", "."] {
        let records = coordinator.list_directory(alias).await.unwrap();
        assert_eq!(names(&records), vec!["top.txt".to_string()], "alias {alias:?}");
    }
}

#[tokio::test]
async fn test_listing_reflects_directory_scan_changes() {
    let env = TestEnv::new();
    env.write_file("movies/a.mp4", b"a");
    let coordinator = env.coordinator().await;
    coordinator.scan_directory("movies", ScanDepth::Single).await.unwrap();

    let cached = coordinator.list_directory("movies").await.unwrap();
    assert_eq!(names(&cached), vec!["a.mp4".to_string()]);

    fs::remove_file(env.root.join("movies/a.mp4")).unwrap();
    env.write_file("movies/c.mp4", b"c");
    coordinator.scan_directory("movies", ScanDepth::Single).await.unwrap();

    let fresh = coordinator.list_directory("movies").await.unwrap();
    assert_eq!(names(&fresh), vec!["c.mp4".to_string()]);
}

#[tokio::test]
async fn test_listing_of_parent_reflects_deleted_child() {
    let env = TestEnv::new();
    env.write_file("movies/b/c.mp4", b"c");
    env.write_file("music/x.mp3", b"x");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    assert_eq!(coordinator.list_directory("").await.unwrap().len(), 2);
    assert_eq!(coordinator.list_directory("movies/b").await.unwrap().len(), 1);

    coordinator.delete_path("movies").await.unwrap();

    assert_eq!(
        names(&coordinator.list_directory("").await.unwrap()),
        vec!["music".to_string()]
    );
    assert!(coordinator.list_directory("movies/b").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cache_miss_refreshes_directory_in_background() {
    let env = TestEnv::new();
    env.write_file("fresh/new.txt", b"n");
    let mut config = env.config();
    config.refresh_on_miss = true;
    let coordinator = SyncCoordinator::open(config).await.unwrap();

    // Nothing catalogued yet; the miss schedules a scan of the directory.
    assert!(coordinator.list_directory("fresh").await.unwrap().is_empty());

    let mut found = false;
    for _ in 0..100 {
        if coordinator.db().get("fresh/new.txt").await.unwrap().is_some() {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(found, "background refresh never catalogued the file");
    assert_eq!(
        names(&coordinator.list_directory("fresh").await.unwrap()),
        vec!["new.txt".to_string()]
    );
}

// ============================================================================
// User mutations
// ============================================================================

#[tokio::test]
async fn test_delete_file_updates_disk_and_catalog() {
    let env = TestEnv::new();
    env.write_file("movies/a.mp4", b"a");
    env.write_file("movies/z.mp4", b"z");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();
    assert_eq!(coordinator.list_directory("movies").await.unwrap().len(), 2);

    let removed = coordinator.delete_path("movies/a.mp4").await.unwrap();

    assert_eq!(removed, 1);
    assert!(!env.root.join("movies/a.mp4").exists());
    assert_eq!(
        names(&coordinator.list_directory("movies").await.unwrap()),
        vec!["z.mp4".to_string()]
    );
}

#[tokio::test]
async fn test_delete_directory_removes_subtree() {
    let env = TestEnv::new();
    env.write_file("movies/b/c.mp4", b"c");
    env.write_file("movies/b/d/e.mp4", b"e");
    env.write_file("movies/bb.mp4", b"bb");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    let removed = coordinator.delete_path("movies/b").await.unwrap();

    assert_eq!(removed, 4);
    assert!(!env.root.join("movies/b").exists());
    assert!(coordinator.db().get("movies/bb.mp4").await.unwrap().is_some());
    assert_eq!(coordinator.db().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_delete_already_missing_path_cleans_catalog() {
    let env = TestEnv::new();
    let path = env.write_file("stale.txt", b"s");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();
    fs::remove_file(path).unwrap();

    assert_eq!(coordinator.delete_path("stale.txt").await.unwrap(), 1);
    assert!(matches!(
        coordinator.delete_path("stale.txt").await,
        Err(SyncError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_refuses_root() {
    let env = TestEnv::new();
    let coordinator = env.coordinator().await;
    assert!(matches!(
        coordinator.delete_path("/").await,
        Err(SyncError::InvalidPath(_))
    ));
    assert!(env.root.exists());
}

#[tokio::test]
async fn test_rename_file_reconciles_parent() {
    let env = TestEnv::new();
    env.write_file("movies/a.mp4", b"a");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();
    assert_eq!(coordinator.list_directory("movies").await.unwrap().len(), 1);

    let outcome = coordinator.rename_path("movies/a.mp4", "renamed.mp4").await.unwrap();

    assert_eq!(outcome.new_path, "movies/renamed.mp4");
    assert!(outcome.subtree_scan.is_none());
    assert!(env.root.join("movies/renamed.mp4").exists());
    assert!(coordinator.db().get("movies/a.mp4").await.unwrap().is_none());
    assert_eq!(
        names(&coordinator.list_directory("movies").await.unwrap()),
        vec!["renamed.mp4".to_string()]
    );
}

#[tokio::test]
async fn test_rename_directory_recatalogs_subtree() {
    let env = TestEnv::new();
    env.write_file("movies/b/c.mp4", b"c");
    env.write_file("movies/b/d/e.mp4", b"e");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    let outcome = coordinator.rename_path("movies/b", "archive").await.unwrap();
    outcome.subtree_scan.unwrap().wait().await.unwrap();

    assert!(coordinator.db().get("movies/b").await.unwrap().is_none());
    assert!(coordinator.db().get("movies/b/d/e.mp4").await.unwrap().is_none());

    let moved = coordinator.db().get("movies/archive/d/e.mp4").await.unwrap().unwrap();
    assert_eq!(moved.parent_path, "movies/archive/d");
    assert!(coordinator.db().get("movies/archive").await.unwrap().unwrap().is_directory);
    assert_eq!(coordinator.db().count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_rename_rejects_bad_names_and_collisions() {
    let env = TestEnv::new();
    env.write_file("a.txt", b"a");
    env.write_file("b.txt", b"b");
    let coordinator = env.coordinator().await;

    for bad in ["", "..", "x/y", "x\\y"] {
        assert!(
            matches!(
                coordinator.rename_path("a.txt", bad).await,
                Err(SyncError::InvalidPath(_))
            ),
            "name {bad:?}"
        );
    }
    assert!(matches!(
        coordinator.rename_path("a.txt", "b.txt").await,
        Err(SyncError::AlreadyExists(_))
    ));
    assert!(matches!(
        coordinator.rename_path("missing.txt", "c.txt").await,
        Err(SyncError::NotFound(_))
    ));
    assert_eq!(fs::read(env.root.join("b.txt")).unwrap(), b"b");
}

// ============================================================================
// Startup and search
// ============================================================================

#[tokio::test]
async fn test_bootstrap_runs_full_scan_only_once() {
    let env = TestEnv::new();
    env.write_file("a/b.txt", b"b");

    {
        let coordinator = env.coordinator().await;
        let handle = coordinator.bootstrap().await.unwrap().unwrap();
        handle.wait().await.unwrap();
        assert!(coordinator.bootstrap().await.unwrap().is_none());
        coordinator.db().clone().close().await;
    }

    // The flag survives a restart.
    let coordinator = env.coordinator().await;
    assert!(coordinator.bootstrap().await.unwrap().is_none());
    assert_eq!(coordinator.full_scans_started(), 0);
    assert_eq!(coordinator.db().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_search_matches_names_case_insensitively() {
    let env = TestEnv::new();
    env.write_file("movies/Holiday.MP4", b"h");
    env.write_file("movies/holiday-notes.txt", b"n");
    env.write_file("music/song.mp3", b"s");
    let coordinator = env.coordinator().await;
    coordinator.run_full_scan().await.unwrap();

    let hits = coordinator.search("HOLIDAY", 10).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|r| r.parent_path == "movies"));

    assert_eq!(coordinator.search("holiday", 1).await.unwrap().len(), 1);
    assert!(coordinator.search("nothing-like-this", 10).await.unwrap().is_empty());
}
