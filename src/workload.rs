//! Simulated read/write traffic against a cache.
//!
//! A writer stores a handful of keys up front, then several readers scan the
//! key range. Reader `i` starts `i * second_pass_delay` after the first, so
//! later passes find whatever the earlier ones left resident.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cache::CacheHandle;
use crate::config::WorkloadConfig;

/// Outcome of a workload run, as seen by the callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadReport {
    pub writes: u64,
    pub reads: u64,
    /// Reads that returned a block.
    pub served: u64,
    /// Reads that returned nothing (not cached and the store failed).
    pub absent: u64,
}

impl WorkloadReport {
    fn merge(&mut self, other: WorkloadReport) {
        self.writes += other.writes;
        self.reads += other.reads;
        self.served += other.served;
        self.absent += other.absent;
    }
}

/// Run the configured workload to completion.
pub async fn run(cache: Arc<dyn CacheHandle>, config: &WorkloadConfig) -> anyhow::Result<WorkloadReport> {
    let mut report = write_pass(Arc::clone(&cache), config.writes.clone()).await?;
    info!(writes = report.writes, "Data written to cache");

    let mut readers = JoinSet::new();
    for reader in 0..config.readers {
        let cache = Arc::clone(&cache);
        let config = config.clone();
        readers.spawn(async move { read_pass(cache, reader, &config).await });
    }

    while let Some(result) = readers.join_next().await {
        report.merge(result??);
    }

    info!(
        reads = report.reads,
        served = report.served,
        absent = report.absent,
        "Workload complete"
    );
    Ok(report)
}

async fn write_pass(cache: Arc<dyn CacheHandle>, keys: Vec<u64>) -> anyhow::Result<WorkloadReport> {
    let report = tokio::task::spawn_blocking(move || {
        for &key in &keys {
            cache.set(key, Bytes::from(format!("data{key}")));
        }
        WorkloadReport {
            writes: keys.len() as u64,
            ..Default::default()
        }
    })
    .await?;
    Ok(report)
}

async fn read_pass(
    cache: Arc<dyn CacheHandle>,
    reader: usize,
    config: &WorkloadConfig,
) -> anyhow::Result<WorkloadReport> {
    let start_delay = config.second_pass_delay() * reader as u32;
    if !start_delay.is_zero() {
        tokio::time::sleep(start_delay).await;
    }
    debug!(reader, keys = config.keys, "Reader started");

    let mut report = WorkloadReport::default();
    for key in 0..config.keys {
        // The cache blocks on its lock and on store reads.
        let c = Arc::clone(&cache);
        let block = tokio::task::spawn_blocking(move || c.get(key)).await?;

        report.reads += 1;
        match block {
            Some(data) => {
                report.served += 1;
                debug!(reader, key, size = data.len(), "Read served");
            }
            None => {
                report.absent += 1;
                debug!(reader, key, "Read absent");
            }
        }

        if !config.read_interval().is_zero() {
            tokio::time::sleep(config.read_interval()).await;
        }
    }

    Ok(report)
}
