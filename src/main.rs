//! block-cache: runs a simulated workload against the segmented block cache
//! and reports what the cache served.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use block_cache::cache::{BlockCache, CacheHandle, ShardedBlockCache};
use block_cache::config::{Cli, Config, StoreKind};
use block_cache::server::stats_api::{self, AppState};
use block_cache::store::{BackingStore, FileBlockStore, SyntheticBlockStore};
use block_cache::workload;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "block_cache=debug,tower_http=debug"
    } else {
        "block_cache=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("block-cache v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    info!(
        capacity = config.cache.capacity,
        shards = config.cache.shards,
        store = ?config.store.kind,
        block_size = config.store.block_size,
        "Configuration loaded"
    );

    let store = open_store(&config)?;
    let cache = build_cache(&config, store)?;

    // Optional stats server, running alongside the workload.
    if let Some(ref listen_addr) = config.server.stats_listen {
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("binding stats server to {listen_addr}"))?;
        let state = Arc::new(AppState::new(Arc::clone(&cache)));
        tokio::spawn(async move {
            if let Err(e) = stats_api::serve(listener, state).await {
                error!(error = %e, "Stats server stopped");
            }
        });
    }

    let report = workload::run(Arc::clone(&cache), &config.workload).await?;
    let stats = cache.stats();

    info!(
        reads = report.reads,
        served = report.served,
        absent = report.absent,
        hits = stats.hits,
        misses = stats.misses,
        fetch_failures = stats.fetch_failures,
        evictions = stats.evictions,
        recency = stats.recency_len,
        frequency = stats.frequency_len,
        hit_ratio = stats.hit_ratio(),
        "Cache summary"
    );

    Ok(())
}

fn open_store(config: &Config) -> anyhow::Result<Box<dyn BackingStore>> {
    let store: Box<dyn BackingStore> = match config.store.kind {
        StoreKind::Synthetic => Box::new(SyntheticBlockStore::new(
            config.store.block_size,
            config.store.num_blocks,
            config.store.latency(),
        )),
        StoreKind::File => {
            let path = config
                .store
                .path
                .as_ref()
                .context("store.path is required for the file store")?;
            let store = FileBlockStore::open(path, config.store.block_size)
                .with_context(|| format!("opening block file {}", path.display()))?;
            info!(path = %path.display(), blocks = store.block_count(), "Opened block file");
            Box::new(store)
        }
    };
    Ok(store)
}

fn build_cache(
    config: &Config,
    store: Box<dyn BackingStore>,
) -> anyhow::Result<Arc<dyn CacheHandle>> {
    let cache: Arc<dyn CacheHandle> = if config.cache.shards > 1 {
        Arc::new(ShardedBlockCache::new(
            config.cache.capacity,
            config.cache.shards,
            store,
        )?)
    } else {
        Arc::new(BlockCache::new(config.cache.capacity, store)?)
    };
    Ok(cache)
}
