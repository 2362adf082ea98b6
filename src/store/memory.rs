//! In-memory block stores.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::RwLock;

use crate::store::{BackingStore, BlockKey, StoreError};

/// A map of blocks held in memory. Unknown keys are `NotFound`.
#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<BlockKey, Bytes>>,
    reads: AtomicU64,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: BlockKey, block: impl Into<Bytes>) {
        self.blocks.write().insert(key, block.into());
    }

    pub fn remove(&self, key: BlockKey) -> Option<Bytes> {
        self.blocks.write().remove(&key)
    }

    /// Number of `read_block` calls served, successful or not.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl FromIterator<(BlockKey, Bytes)> for MemoryBlockStore {
    fn from_iter<I: IntoIterator<Item = (BlockKey, Bytes)>>(iter: I) -> Self {
        Self {
            blocks: RwLock::new(iter.into_iter().collect()),
            reads: AtomicU64::new(0),
        }
    }
}

impl BackingStore for MemoryBlockStore {
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.blocks
            .read()
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound(key))
    }
}

/// Generates deterministic blocks for keys `0..num_blocks`.
///
/// Each read sleeps for `latency` to stand in for a slow device.
pub struct SyntheticBlockStore {
    block_size: usize,
    num_blocks: u64,
    latency: Duration,
    reads: AtomicU64,
}

impl SyntheticBlockStore {
    pub fn new(block_size: usize, num_blocks: u64, latency: Duration) -> Self {
        Self {
            block_size,
            num_blocks,
            latency,
            reads: AtomicU64::new(0),
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// The block this store returns for `key`.
    pub fn block_for(&self, key: BlockKey) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.block_size);
        let seed = key.to_le_bytes();
        for i in 0..self.block_size {
            buf.put_u8(seed[i % seed.len()] ^ (i as u8));
        }
        buf.freeze()
    }
}

impl BackingStore for SyntheticBlockStore {
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if key >= self.num_blocks {
            return Err(StoreError::NotFound(key));
        }
        Ok(self.block_for(key))
    }
}
