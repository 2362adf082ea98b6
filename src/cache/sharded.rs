//! Key-hash sharded front end over several [`BlockCache`]s.
//!
//! Each shard has its own lock and its own share of the capacity. A key
//! always routes to the same shard, so the one-fetch-per-key guarantee of a
//! single cache still holds.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use crate::cache::block_cache::BlockCache;
use crate::cache::metrics::CacheMetrics;
use crate::cache::segmented::CacheStats;
use crate::cache::{CacheError, CacheHandle};
use crate::store::{BackingStore, BlockKey};

pub struct ShardedBlockCache<S> {
    shards: Vec<BlockCache<Arc<S>>>,
    metrics: CacheMetrics,
}

impl<S: BackingStore> ShardedBlockCache<S> {
    /// Split `capacity` across `shards` caches sharing one backing store.
    ///
    /// Requires `capacity >= shards >= 1` so every shard holds at least one
    /// entry.
    pub fn new(capacity: usize, shards: usize, store: S) -> Result<Self, CacheError> {
        if shards == 0 || shards > capacity {
            return Err(CacheError::InvalidShardCount { shards, capacity });
        }

        let store = Arc::new(store);
        let metrics = CacheMetrics::new()?;
        let base = capacity / shards;
        let extra = capacity % shards;

        let shards = (0..shards)
            .map(|i| {
                let shard_capacity = base + usize::from(i < extra);
                BlockCache::with_metrics(shard_capacity, Arc::clone(&store), metrics.clone())
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(capacity, shards = shards.len(), "Created sharded block cache");

        Ok(Self { shards, metrics })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard that owns `key`.
    pub fn shard_for(&self, key: BlockKey) -> &BlockCache<Arc<S>> {
        &self.shards[self.shard_index(key)]
    }

    pub fn shard_index(&self, key: BlockKey) -> usize {
        // Fibonacci hashing spreads sequential keys across shards.
        let hash = key.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        ((hash >> 32) % self.shards.len() as u64) as usize
    }

    pub fn shards(&self) -> &[BlockCache<Arc<S>>] {
        &self.shards
    }

    pub fn get(&self, key: BlockKey) -> Option<Bytes> {
        self.shard_for(key).get(key)
    }

    pub fn set(&self, key: BlockKey, value: Bytes) {
        self.shard_for(key).set(key, value)
    }

    pub fn contains(&self, key: BlockKey) -> bool {
        self.shard_for(key).contains(key)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.is_empty())
    }

    pub fn capacity(&self) -> usize {
        self.shards.iter().map(|s| s.capacity()).sum()
    }

    /// Stats summed over all shards. Each shard is locked in turn, so the
    /// totals are not a single atomic snapshot.
    pub fn stats(&self) -> CacheStats {
        self.shards
            .iter()
            .fold(CacheStats::default(), |acc, shard| acc.merge(&shard.stats()))
    }
}

impl<S: BackingStore> CacheHandle for ShardedBlockCache<S> {
    fn get(&self, key: BlockKey) -> Option<Bytes> {
        ShardedBlockCache::get(self, key)
    }

    fn set(&self, key: BlockKey, value: Bytes) {
        ShardedBlockCache::set(self, key, value)
    }

    fn stats(&self) -> CacheStats {
        ShardedBlockCache::stats(self)
    }

    fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBlockStore;

    #[test]
    fn test_capacity_split_across_shards() {
        let cache = ShardedBlockCache::new(10, 4, MemoryBlockStore::new()).unwrap();
        let caps: Vec<usize> = cache.shards().iter().map(|s| s.capacity()).collect();
        assert_eq!(caps, vec![3, 3, 2, 2]);
        assert_eq!(cache.capacity(), 10);
    }

    #[test]
    fn test_invalid_shard_counts() {
        assert!(matches!(
            ShardedBlockCache::new(4, 0, MemoryBlockStore::new()),
            Err(CacheError::InvalidShardCount { shards: 0, capacity: 4 })
        ));
        assert!(matches!(
            ShardedBlockCache::new(2, 3, MemoryBlockStore::new()),
            Err(CacheError::InvalidShardCount { shards: 3, capacity: 2 })
        ));
    }

    #[test]
    fn test_key_lives_in_its_shard_only() {
        let cache = ShardedBlockCache::new(16, 4, MemoryBlockStore::new()).unwrap();
        for k in 0..8 {
            cache.set(k, Bytes::from(vec![k as u8]));
        }

        for k in 0..8 {
            let owner = cache.shard_index(k);
            for (i, shard) in cache.shards().iter().enumerate() {
                assert_eq!(shard.contains(k), i == owner, "key {k} shard {i}");
            }
            assert_eq!(cache.get(k), Some(Bytes::from(vec![k as u8])));
        }
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.stats().hits, 8);
    }
}
