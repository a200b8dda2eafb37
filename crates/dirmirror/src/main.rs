//! dirmirror command line
//!
//! One-shot commands (`scan`, `ls`, `find`, `rm`, `mv`, `status`) open the
//! catalog, do their work and exit. `run` keeps the catalog in step with the
//! disk until interrupted.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dirmirror::{MirrorConfig, PathRecord, ScanDepth, ScanReport, SyncCoordinator};
use dirmirror_logging::LogConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "dirmirror", about = "Mirror a directory tree into a queryable catalog")]
struct Cli {
    /// Configuration file (TOML); defaults to ~/.dirmirror/config.toml if present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory tree to mirror
    #[arg(long, global = true, env = "DIRMIRROR_ROOT")]
    root: Option<PathBuf>,

    /// Catalog database (sqlite: URL or file path)
    #[arg(long, global = true, env = "DIRMIRROR_DATABASE_URL")]
    database: Option<String>,

    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a directory (or the whole tree with --full) into the catalog
    Scan {
        /// Directory to scan, relative to the root
        #[arg(default_value = "")]
        path: String,

        /// Walk the entire root without reconciling deletions
        #[arg(long, conflicts_with = "recursive")]
        full: bool,

        /// Also scan every subdirectory
        #[arg(short, long)]
        recursive: bool,
    },

    /// List a directory from the catalog
    Ls {
        #[arg(default_value = "")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search catalog entries by name
    Find {
        /// Case-insensitive substring of the entry name
        substring: String,

        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a file or directory from disk and from the catalog
    Rm { path: String },

    /// Rename a file or directory within its parent
    Mv { path: String, new_name: String },

    /// Show catalog status
    Status,

    /// Bootstrap the catalog, then rescan the root periodically until Ctrl-C
    Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = dirmirror_logging::init_logging(LogConfig {
        app_name: "dirmirror",
        verbose: cli.verbose,
        log_dir: None,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to start runtime: {}", err);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

async fn run_command(cli: Cli) -> Result<()> {
    let mut config = resolve_config(&cli)?;

    // One-shot listings exit before a background refresh could finish.
    if matches!(cli.command, Commands::Ls { .. }) {
        config.refresh_on_miss = false;
    }

    let coordinator = SyncCoordinator::open(config)
        .await
        .context("Failed to open catalog")?;

    match cli.command {
        Commands::Scan {
            path,
            full,
            recursive,
        } => cmd_scan(&coordinator, &path, full, recursive).await,
        Commands::Ls { path, json } => cmd_ls(&coordinator, &path, json).await,
        Commands::Find {
            substring,
            limit,
            json,
        } => cmd_find(&coordinator, &substring, limit, json).await,
        Commands::Rm { path } => {
            let removed = coordinator
                .delete_path(&path)
                .await
                .with_context(|| format!("Failed to delete '{}'", path))?;
            println!("Deleted {} ({} catalog records)", path, removed);
            Ok(())
        }
        Commands::Mv { path, new_name } => {
            let outcome = coordinator
                .rename_path(&path, &new_name)
                .await
                .with_context(|| format!("Failed to rename '{}'", path))?;
            if let Some(scan) = outcome.subtree_scan {
                scan.wait().await.context("Failed to catalog renamed directory")?;
            }
            println!("Renamed {} -> {}", path, outcome.new_path);
            Ok(())
        }
        Commands::Status => cmd_status(&coordinator).await,
        Commands::Run => cmd_run(&coordinator).await,
    }
}

/// File config (explicit or default location), then flag/env overrides.
fn resolve_config(cli: &Cli) -> Result<MirrorConfig> {
    let mut config = match &cli.config {
        Some(path) => MirrorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default_path = dirmirror_logging::dirmirror_home()?.join("config.toml");
            if default_path.exists() {
                MirrorConfig::load(&default_path).with_context(|| {
                    format!("Failed to load config from {}", default_path.display())
                })?
            } else {
                MirrorConfig::default()
            }
        }
    };

    if let Some(root) = &cli.root {
        config.root_dir = root.clone();
    }
    if let Some(database) = &cli.database {
        config.database_url = database.clone();
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_scan(
    coordinator: &SyncCoordinator,
    path: &str,
    full: bool,
    recursive: bool,
) -> Result<()> {
    ensure_root(coordinator)?;

    let report = if full {
        match coordinator.run_full_scan().await? {
            Some(report) => report,
            None => bail!("A full scan is already running"),
        }
    } else {
        let depth = if recursive {
            ScanDepth::Recursive
        } else {
            ScanDepth::Single
        };
        coordinator
            .scan_directory(path, depth)
            .await
            .with_context(|| format!("Failed to scan '{}'", path))?
    };

    print_report(&report);
    Ok(())
}

async fn cmd_ls(coordinator: &SyncCoordinator, path: &str, json: bool) -> Result<()> {
    let records = coordinator.list_directory(path).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("(empty)");
        return Ok(());
    }
    for record in &records {
        print_record(record);
    }
    Ok(())
}

async fn cmd_find(
    coordinator: &SyncCoordinator,
    substring: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let records = coordinator.search(substring, limit).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    for record in &records {
        let suffix = if record.is_directory { "/" } else { "" };
        println!("{}{}", record.full_path, suffix);
    }
    println!("{} match(es)", records.len());
    Ok(())
}

async fn cmd_status(coordinator: &SyncCoordinator) -> Result<()> {
    let db = coordinator.db();
    let records = db.count().await?;
    let initialized = db.initial_scan_completed().await?;

    println!("Root:          {}", coordinator.root().display());
    println!("Database:      {}", coordinator.config().database_url);
    println!("Records:       {}", records);
    println!(
        "Initial scan:  {}",
        if initialized { "completed" } else { "pending" }
    );
    Ok(())
}

async fn cmd_run(coordinator: &SyncCoordinator) -> Result<()> {
    ensure_root(coordinator)?;

    let mut startup = coordinator.bootstrap().await?;
    let mut ticker = tokio::time::interval(coordinator.config().poll_interval());
    // The first tick fires immediately; the bootstrap scan covers it.
    ticker.tick().await;

    info!(
        root = %coordinator.root().display(),
        interval_secs = coordinator.config().poll_interval().as_secs(),
        "Watching for changes"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received; shutting down");
                if let Some(handle) = startup.take() {
                    handle.cancel();
                    if let Err(err) = handle.wait().await {
                        warn!(error = %err, "Startup scan ended with an error");
                    }
                }
                return Ok(());
            }
            _ = ticker.tick() => {
                if startup.as_ref().is_some_and(|handle| handle.is_finished()) {
                    if let Some(handle) = startup.take() {
                        match handle.wait().await {
                            Ok(report) => print_report(&report),
                            Err(err) => warn!(error = %err, "Startup scan failed"),
                        }
                    }
                }
                if coordinator.is_full_scan_running() {
                    info!("Full scan still running; skipping poll");
                    continue;
                }
                match coordinator.scan_directory("", ScanDepth::Recursive).await {
                    Ok(report) => info!(
                        directories = report.directories_scanned,
                        deleted = report.records_deleted,
                        "Poll rescan finished"
                    ),
                    Err(err) => warn!(error = %err, "Poll rescan failed"),
                }
            }
        }
    }
}

fn ensure_root(coordinator: &SyncCoordinator) -> Result<()> {
    let root = coordinator.root();
    if !root.is_dir() {
        bail!(
            "Root directory {} does not exist or is not a directory",
            root.display()
        );
    }
    Ok(())
}

fn print_record(record: &PathRecord) {
    let modified = record.modified_at.format("%Y-%m-%d %H:%M");
    if record.is_directory {
        println!("{:>12}  {}  {}/", "-", modified, record.name);
    } else {
        println!(
            "{:>12}  {}  {}",
            format_size(record.size_bytes),
            modified,
            record.name
        );
    }
}

fn print_report(report: &ScanReport) {
    println!(
        "{:?} scan of '{}': {} seen, {} upserted, {} deleted, {} skipped in {} ms{}",
        report.kind,
        report.path,
        report.entries_seen,
        report.records_upserted,
        report.records_deleted,
        report.entries_skipped + report.records_skipped,
        report.duration_ms,
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
