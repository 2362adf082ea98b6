//! Segmented block cache.
//!
//! This module contains the cache data structures and policy:
//! - [`entry`]: CacheEntry, SegmentKind, Location
//! - [`segment`]: slab-backed ordered list with O(1) move-to-front
//! - [`evictor`]: eviction from the recency tail
//! - [`segmented`]: unsynchronized core (index + both segments)
//! - [`block_cache`]: mutex-guarded read-through cache over a backing store
//! - [`sharded`]: key-hash sharding over several caches
//! - [`metrics`]: Prometheus series

pub mod block_cache;
pub mod entry;
pub mod evictor;
pub mod metrics;
pub mod segment;
pub mod segmented;
pub mod sharded;

use bytes::Bytes;
use thiserror::Error;

pub use block_cache::BlockCache;
pub use entry::{CacheEntry, SegmentKind};
pub use metrics::CacheMetrics;
pub use segmented::CacheStats;
pub use sharded::ShardedBlockCache;

use crate::store::BlockKey;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache capacity must be at least 1 entry, got {0}")]
    InvalidCapacity(usize),

    #[error("Shard count {shards} must be between 1 and the capacity ({capacity})")]
    InvalidShardCount { shards: usize, capacity: usize },

    #[error("Metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// The caller-facing cache surface shared by [`BlockCache`] and
/// [`ShardedBlockCache`].
pub trait CacheHandle: Send + Sync {
    fn get(&self, key: BlockKey) -> Option<Bytes>;

    fn set(&self, key: BlockKey, value: Bytes);

    fn stats(&self) -> CacheStats;

    fn metrics(&self) -> &CacheMetrics;
}
