//! CLI for inspecting and monitoring a volume pool

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use volkeeper::common::{format_bytes, parse_duration};
use volkeeper::volume::SpaceSnapshot;
use volkeeper::{PoolConfig, Volume, VolumePool};

#[derive(Parser)]
#[command(name = "volkeeper")]
#[command(about = "Volume lifecycle and disk space admission for archive storage pools")]
#[command(version)]
struct Cli {
    /// Pool configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh and list every volume
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Refresh and report the volume accepting writes
    Check,

    /// Refresh space accounting periodically until interrupted
    Watch {
        /// Refresh interval (e.g. "30s", "5m"); defaults to the configured one
        #[arg(long)]
        interval: Option<String>,
    },
}

#[derive(Serialize)]
struct VolumeReport {
    id: String,
    status: String,
    path: PathBuf,
    index_path: PathBuf,
    max_size_mb: u64,
    space: SpaceSnapshot,
    admission: String,
}

impl VolumeReport {
    fn new(volume: &Volume) -> Self {
        let admission = volume.admission();
        Self {
            id: volume.id(),
            status: volume.status().to_string(),
            path: volume.path().to_path_buf(),
            index_path: volume.index_path().to_path_buf(),
            max_size_mb: volume.max_size_mb(),
            space: volume.snapshot(),
            admission: admission
                .decision
                .error_message()
                .unwrap_or_else(|| "accepting writes".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PoolConfig::load(cli.config.as_deref())?;

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let pool = Arc::new(VolumePool::from_config(&config)?);

    match cli.command {
        Commands::Status { json } => {
            pool.refresh_all();
            let reports: Vec<_> = pool.volumes().iter().map(|v| VolumeReport::new(v)).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_table(&reports);
            }
        }

        Commands::Check => {
            pool.refresh_all();
            match pool.writable_volume() {
                Some(volume) => {
                    println!("Writable volume: {} ({})", volume.id(), volume.path().display());
                }
                None => bail!("no volume can accept writes"),
            }
        }

        Commands::Watch { interval } => {
            let interval = match interval {
                Some(s) => parse_duration(&s)?,
                None => config.refresh_interval()?,
            };
            watch(pool, interval).await?;
        }
    }

    Ok(())
}

fn print_table(reports: &[VolumeReport]) {
    println!("Volumes: {}", reports.len());
    for report in reports {
        let space = &report.space;
        println!("  {} [{}]", report.id, report.status);
        println!("    Store: {}", report.path.display());
        println!("    Index: {}", report.index_path.display());
        println!(
            "    Used: {} / {}",
            format_bytes(space.used_space()),
            format_bytes(report.max_size_mb.saturating_mul(1024 * 1024))
        );
        if space.space_check_performed && space.disk_space_checking {
            println!(
                "    Free: index {}, store {}",
                format_bytes(space.free_index_space),
                format_bytes(space.free_archive_space)
            );
        }
        println!("    Admission: {}", report.admission);
    }
}

async fn watch(pool: Arc<VolumePool>, interval: std::time::Duration) -> Result<()> {
    tracing::info!("Refreshing {} volume(s) every {:?}", pool.len(), interval);
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let worker = pool.clone();
                tokio::task::spawn_blocking(move || worker.refresh_all()).await?;
                if pool.writable_volume().is_none() {
                    tracing::warn!("no volume can accept writes");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}
