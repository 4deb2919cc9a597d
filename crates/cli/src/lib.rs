// Re-export command modules
pub mod commands;
pub mod output;

// Re-export commonly used types
pub use commands::Commands;

use clap::Parser;
use shmring_cache::{RegionConfig, RegionConfigLoader, SyncPolicy};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shmring")]
#[command(about = "Inspect, fill and drain memory-mapped shmring regions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Region file (overrides SHMRING_PATH and the config file)
    #[arg(long, global = true)]
    pub path: Option<PathBuf>,

    /// Capacity of each block in bytes; an existing region with another capacity is
    /// migrated. Without it existing regions keep the capacity they were created with
    #[arg(long, global = true)]
    pub capacity: Option<u64>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// When to flush mapped pages to disk (never, on-rewrite, always)
    #[arg(long, global = true, value_parser = parse_sync)]
    pub sync: Option<SyncPolicy>,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_sync(value: &str) -> Result<SyncPolicy, String> {
    value.parse().map_err(|e: shmring_cache::CacheError| e.to_string())
}

impl Cli {
    /// Resolve the region configuration with command line flags on top
    pub fn region_config(&self) -> eyre::Result<RegionConfig> {
        let config = RegionConfigLoader::load(self.config.as_deref())?;
        let config = RegionConfigLoader::apply_cli_args(
            config,
            self.path.clone(),
            self.capacity,
            self.sync,
        );
        config.validate()?;
        Ok(config)
    }
}

/// Run a parsed command line, writing results to `out`
pub fn run(cli: Cli, out: &mut impl Write) -> eyre::Result<()> {
    let config = cli.region_config()?;
    tracing::debug!(path = %config.path.display(), source = ?config.source, "resolved region config");
    cli.command.execute(&config, out)
}
