//! Configuration for the sync engine

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration, loadable from TOML. Every field has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Directory tree being mirrored
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Catalog connection string (`sqlite:` URL or file path)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Records per upsert transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Files at or above this size are not hashed during full scans
    #[serde(default = "default_hash_size_ceiling")]
    pub hash_size_ceiling: u64,

    /// Listing cache entry lifetime
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u64,

    /// Worker limit for recursive directory-scan fan-out
    #[serde(default = "default_max_concurrent_dir_scans")]
    pub max_concurrent_dir_scans: usize,

    #[serde(default)]
    pub follow_symlinks: bool,

    /// Log progress every N entries during a full scan
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Kick off a background directory scan when a listing misses the cache
    #[serde(default = "default_refresh_on_miss")]
    pub refresh_on_miss: bool,

    /// Interval between root rescans in `run` mode
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_root_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_database_url() -> String {
    dirs::home_dir()
        .map(|h| h.join(".dirmirror").join("catalog.sqlite3"))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "catalog.sqlite3".to_string())
}

fn default_batch_size() -> usize {
    100
}

fn default_hash_size_ceiling() -> u64 {
    16 * 1024 * 1024
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_cache_max_entries() -> u64 {
    10_000
}

fn default_max_concurrent_dir_scans() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

fn default_progress_interval() -> usize {
    1000
}

fn default_refresh_on_miss() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    300
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            database_url: default_database_url(),
            batch_size: default_batch_size(),
            hash_size_ceiling: default_hash_size_ceiling(),
            cache_ttl_secs: default_cache_ttl(),
            cache_max_entries: default_cache_max_entries(),
            max_concurrent_dir_scans: default_max_concurrent_dir_scans(),
            follow_symlinks: false,
            progress_interval: default_progress_interval(),
            refresh_on_miss: default_refresh_on_miss(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl MirrorConfig {
    /// Default configuration rooted at `root_dir`.
    pub fn for_root(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MirrorConfig =
            toml::from_str(&content).map_err(|e| crate::SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::SyncError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::SyncError::Config("batch_size must be at least 1".to_string()));
        }
        if self.max_concurrent_dir_scans == 0 {
            return Err(crate::SyncError::Config(
                "max_concurrent_dir_scans must be at least 1".to_string(),
            ));
        }
        if self.root_dir.as_os_str().is_empty() {
            return Err(crate::SyncError::Config("root_dir must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
