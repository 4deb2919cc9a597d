//! Region configuration management with precedence and validation
//!
//! Values are resolved from, lowest to highest precedence: built-in
//! defaults, the JSON config file, `SHMRING_*` environment variables and
//! finally command line flags.
use crate::errors::{CacheError, Result};
use crate::storage::layout::validate_capacity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default block capacity (1 MiB per block)
pub const DEFAULT_BLOCK_CAPACITY: u64 = 1024 * 1024;

pub const ENV_PATH: &str = "SHMRING_PATH";
pub const ENV_BLOCK_CAPACITY: &str = "SHMRING_BLOCK_CAPACITY";
pub const ENV_SYNC: &str = "SHMRING_SYNC";

/// When mapped pages are flushed back to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncPolicy {
    /// Leave write-back to the operating system
    #[default]
    Never,
    /// Flush after every rewrite
    OnRewrite,
    /// Flush after every write, including saves and releases
    Always,
}

impl SyncPolicy {
    pub fn syncs_rewrites(self) -> bool {
        matches!(self, Self::OnRewrite | Self::Always)
    }

    pub fn syncs_saves(self) -> bool {
        self == Self::Always
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Never => "never",
            Self::OnRewrite => "on-rewrite",
            Self::Always => "always",
        })
    }
}

impl FromStr for SyncPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "never" | "off" => Ok(Self::Never),
            "on-rewrite" | "rewrite" => Ok(Self::OnRewrite),
            "always" => Ok(Self::Always),
            other => Err(CacheError::configuration(format!(
                "unknown sync policy '{other}', expected never, on-rewrite or always"
            ))),
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variable
    EnvironmentVariable(String),
    /// Command line argument
    CommandLine,
}

/// Everything needed to open a shared region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionConfig {
    /// Backing file of the region
    pub path: PathBuf,
    /// Capacity of each of the two blocks, in bytes
    pub block_capacity: u64,
    /// Keep the capacity an existing region was created with
    ///
    /// Set while no layer named a capacity; `block_capacity` then only sizes
    /// new files and an existing region is never migrated.
    pub adopt_stored_capacity: bool,
    pub sync: SyncPolicy,
    /// Highest-precedence source that contributed a value
    pub source: ConfigSource,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            path: default_region_path(),
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            adopt_stored_capacity: true,
            sync: SyncPolicy::default(),
            source: ConfigSource::Default,
        }
    }
}

impl RegionConfig {
    pub fn builder() -> RegionConfigBuilder {
        RegionConfigBuilder::new()
    }

    /// Reject a configuration that could never open a region
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(CacheError::configuration("region path is empty"));
        }
        validate_capacity(self.block_capacity)?;
        Ok(())
    }
}

/// Region file used when nothing else is configured
pub fn default_region_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("shmring")
        .join("region.mmap")
}

/// Builder for creating region configurations
#[derive(Debug, Clone, Default)]
pub struct RegionConfigBuilder {
    config: RegionConfig,
}

impl RegionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Request a capacity; an existing region with another one is migrated
    #[must_use]
    pub fn with_block_capacity(mut self, block_capacity: u64) -> Self {
        self.config.block_capacity = block_capacity;
        self.config.adopt_stored_capacity = false;
        self
    }

    #[must_use]
    pub fn with_adopt_stored_capacity(mut self, adopt: bool) -> Self {
        self.config.adopt_stored_capacity = adopt;
        self
    }

    #[must_use]
    pub fn with_sync(mut self, sync: SyncPolicy) -> Self {
        self.config.sync = sync;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.config.source = source;
        self
    }

    pub fn build(self) -> RegionConfig {
        self.config
    }
}

/// Values one configuration layer sets; unset fields fall through
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct PartialRegionConfig {
    path: Option<PathBuf>,
    block_capacity: Option<u64>,
    sync: Option<SyncPolicy>,
}

impl PartialRegionConfig {
    fn is_empty(&self) -> bool {
        self.path.is_none() && self.block_capacity.is_none() && self.sync.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    region: PartialRegionConfig,
}

/// Resolves a [`RegionConfig`] from all configuration layers
pub struct RegionConfigLoader;

impl RegionConfigLoader {
    /// Load configuration with full precedence handling
    ///
    /// `config_file` replaces the default config file location; unlike the
    /// default location it must exist.
    pub fn load(config_file: Option<&Path>) -> Result<RegionConfig> {
        let mut config = RegionConfig::default();

        let file_layer = match config_file {
            Some(path) => Some((Self::load_from_config_file(path)?, path.to_path_buf())),
            None => {
                let path = Self::default_config_path()?;
                if path.exists() {
                    Some((Self::load_from_config_file(&path)?, path))
                } else {
                    None
                }
            }
        };
        if let Some((layer, path)) = file_layer {
            config = Self::merge_config(config, layer, ConfigSource::ConfigFile(path));
        }

        if let Some(layer) = Self::load_from_env()? {
            config = Self::merge_config(
                config,
                layer,
                ConfigSource::EnvironmentVariable("SHMRING_*".to_string()),
            );
        }

        Ok(config)
    }

    fn load_from_config_file(path: &Path) -> Result<PartialRegionConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CacheError::io(path, "read config file", e))?;

        let file: ConfigFile = serde_json::from_str(&content).map_err(|e| {
            CacheError::configuration(format!("invalid config file {}: {e}", path.display()))
        })?;

        Ok(file.region)
    }

    fn load_from_env() -> Result<Option<PartialRegionConfig>> {
        let mut layer = PartialRegionConfig::default();

        if let Ok(path) = std::env::var(ENV_PATH) {
            layer.path = Some(PathBuf::from(path));
        }

        if let Ok(capacity) = std::env::var(ENV_BLOCK_CAPACITY) {
            let parsed = capacity.trim().parse::<u64>().map_err(|e| {
                CacheError::configuration(format!(
                    "{ENV_BLOCK_CAPACITY}='{capacity}' is not a byte count: {e}"
                ))
            })?;
            layer.block_capacity = Some(parsed);
        }

        if let Ok(sync) = std::env::var(ENV_SYNC) {
            layer.sync = Some(sync.parse()?);
        }

        Ok((!layer.is_empty()).then_some(layer))
    }

    /// `$XDG_CONFIG_HOME/shmring/config.json`, or the platform config dir
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir().ok_or_else(|| {
                CacheError::configuration(
                    "Could not determine config directory; set XDG_CONFIG_HOME or HOME",
                )
            })?,
        };

        Ok(config_dir.join("shmring").join("config.json"))
    }

    fn merge_config(
        mut base: RegionConfig,
        layer: PartialRegionConfig,
        source: ConfigSource,
    ) -> RegionConfig {
        if layer.is_empty() {
            return base;
        }
        if let Some(path) = layer.path {
            base.path = path;
        }
        if let Some(block_capacity) = layer.block_capacity {
            base.block_capacity = block_capacity;
            base.adopt_stored_capacity = false;
        }
        if let Some(sync) = layer.sync {
            base.sync = sync;
        }
        base.source = source;
        base
    }

    /// Apply command line arguments (highest precedence)
    pub fn apply_cli_args(
        config: RegionConfig,
        path: Option<PathBuf>,
        block_capacity: Option<u64>,
        sync: Option<SyncPolicy>,
    ) -> RegionConfig {
        Self::merge_config(
            config,
            PartialRegionConfig {
                path,
                block_capacity,
                sync,
            },
            ConfigSource::CommandLine,
        )
    }
}
