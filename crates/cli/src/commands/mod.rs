use crate::output::{write_records, write_stats};
use clap::Subcommand;
use eyre::{eyre, WrapErr};
use shmring_cache::{Cache, Record, RegionConfig};
use std::io::Write;

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the region header: capacity, active block and cursors
    Inspect {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append one record, or replace the whole content with it
    Push {
        /// Numeric record type
        #[arg(long, default_value_t = 0)]
        proto_id: u16,

        /// Record key
        #[arg(long)]
        key: String,

        /// Payload as UTF-8 text
        #[arg(long, conflicts_with = "hex", required_unless_present = "hex")]
        payload: Option<String>,

        /// Payload as hex
        #[arg(long)]
        hex: Option<String>,

        /// Atomically replace everything unread instead of appending
        #[arg(long)]
        rewrite: bool,
    },

    /// Print unread records without consuming them
    Dump {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print unread records and acknowledge them
    Drain {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Drop all unread content
    Clear,
}

impl Commands {
    pub fn execute(self, config: &RegionConfig, out: &mut impl Write) -> eyre::Result<()> {
        let cache = Cache::open_with_config(config)
            .wrap_err_with(|| format!("failed to open region {}", config.path.display()))?;

        match self {
            Commands::Inspect { json } => write_stats(out, &cache.stats(), json),
            Commands::Push {
                proto_id,
                key,
                payload,
                hex,
                rewrite,
            } => {
                let payload = match (payload, hex) {
                    (Some(text), _) => text.into_bytes(),
                    (None, Some(encoded)) => {
                        hex::decode(encoded.trim()).wrap_err("--hex is not valid hex")?
                    }
                    (None, None) => return Err(eyre!("either --payload or --hex is required")),
                };
                let record = Record::new(proto_id, key, payload);
                let records = std::slice::from_ref(&record);

                if rewrite {
                    cache.rewrite(records)?;
                    tracing::info!(key = %record.key, "rewrote region with one record");
                } else {
                    cache.set(records)?;
                    tracing::info!(key = %record.key, "appended record");
                }
                Ok(())
            }
            Commands::Dump { json } => write_records(out, &cache.get()?, json),
            Commands::Drain { json } => write_records(out, &cache.take()?, json),
            Commands::Clear => {
                cache.clear()?;
                tracing::info!("cleared region");
                Ok(())
            }
        }
    }
}
