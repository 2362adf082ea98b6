//! Runtime configuration for block-cache.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every section has defaults, so a partial file is enough.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "block-cache", about = "Segmented block cache workload runner")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Override the cache capacity (entries).
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Serve cache stats over HTTP on this address while the workload runs.
    #[arg(long)]
    pub stats_listen: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub workload: WorkloadConfig,
    pub server: ServerConfig,
}

/// Cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum resident entries across both segments.
    pub capacity: usize,

    /// Number of independently locked shards (1 = a single cache).
    pub shards: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            shards: 1,
        }
    }
}

/// Which backing store to read blocks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Deterministic generated blocks.
    Synthetic,
    /// Fixed-size blocks in a file at `store.path`.
    File,
}

/// Backing store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,

    /// Block file path (file store only).
    pub path: Option<PathBuf>,

    /// Block size in bytes.
    pub block_size: usize,

    /// Number of blocks the synthetic store can produce.
    pub num_blocks: u64,

    /// Simulated latency per synthetic read, in milliseconds.
    pub latency_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Synthetic,
            path: None,
            block_size: 8 * 1024,
            num_blocks: 100,
            latency_ms: 0,
        }
    }
}

impl StoreConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Simulated workload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Number of reader tasks. Reader `i` starts after `i * second_pass_delay_ms`.
    pub readers: usize,

    /// Each reader reads keys `0..keys` in order.
    pub keys: u64,

    /// Pause between reads within one reader, in milliseconds.
    pub read_interval_ms: u64,

    /// Start delay step between readers, in milliseconds.
    pub second_pass_delay_ms: u64,

    /// Keys written up front with `data<key>` values.
    pub writes: Vec<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            readers: 2,
            keys: 100,
            read_interval_ms: 10,
            second_pass_delay_ms: 200,
            writes: vec![1, 4, 15, 22, 66, 80],
        }
    }
}

impl WorkloadConfig {
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn second_pass_delay(&self) -> Duration {
        Duration::from_millis(self.second_pass_delay_ms)
    }
}

/// HTTP stats surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "127.0.0.1:9100"). Disabled when unset.
    pub stats_listen: Option<String>,
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(capacity) = cli.capacity {
            self.cache.capacity = capacity;
        }
        if let Some(ref listen) = cli.stats_listen {
            self.server.stats_listen = Some(listen.clone());
        }
    }

    /// Check values the cache and stores cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.cache.capacity >= 1, "cache.capacity must be at least 1");
        anyhow::ensure!(
            self.cache.shards >= 1 && self.cache.shards <= self.cache.capacity,
            "cache.shards must be between 1 and cache.capacity"
        );
        anyhow::ensure!(self.store.block_size >= 1, "store.block_size must be at least 1");
        if self.store.kind == StoreKind::File {
            anyhow::ensure!(self.store.path.is_some(), "store.path is required for the file store");
        }
        Ok(())
    }
}
