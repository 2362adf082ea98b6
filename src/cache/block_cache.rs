//! Thread-safe read-through cache in front of a [`BackingStore`].
//!
//! One mutex guards the whole cache. A miss reads the backing store while
//! the lock is held, so at most one fetch is ever in flight and no caller
//! sees a half-updated segment. The price is that a slow store read stalls
//! every other caller.

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::cache::entry::SegmentKind;
use crate::cache::metrics::CacheMetrics;
use crate::cache::segmented::{Admission, CacheStats, SegmentedCache};
use crate::cache::{CacheError, CacheHandle};
use crate::store::{BackingStore, BlockKey};

pub struct BlockCache<S> {
    inner: Mutex<SegmentedCache>,
    store: S,
    metrics: CacheMetrics,
}

impl<S: BackingStore> BlockCache<S> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize, store: S) -> Result<Self, CacheError> {
        Self::with_metrics(capacity, store, CacheMetrics::new()?)
    }

    /// Create a cache reporting into an existing metrics set.
    pub fn with_metrics(
        capacity: usize,
        store: S,
        metrics: CacheMetrics,
    ) -> Result<Self, CacheError> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        Ok(Self {
            inner: Mutex::new(SegmentedCache::new(capacity)),
            store,
            metrics,
        })
    }

    /// Read `key`, fetching it from the backing store on a miss.
    ///
    /// A hit moves the entry to the head of its segment. A fetched block is
    /// admitted into the recency segment. A failed fetch returns `None` and
    /// leaves the cache untouched.
    pub fn get(&self, key: BlockKey) -> Option<Bytes> {
        let mut inner = self.inner.lock();

        if let Some(value) = inner.lookup(key) {
            self.metrics.hits.inc();
            return Some(value);
        }
        self.metrics.misses.inc();

        match self.store.read_block(key) {
            Ok(value) => {
                debug!(key, size = value.len(), "Fetched block from backing store");
                let admission = inner.admit(key, value.clone(), SegmentKind::Recency);
                self.record(&admission, SegmentKind::Recency);
                Some(value)
            }
            Err(err) => {
                inner.record_fetch_failure();
                self.metrics.fetch_failures.inc();
                debug!(key, error = %err, "Backing store read failed, reporting miss");
                None
            }
        }
    }

    /// Insert `value` into the frequency segment.
    ///
    /// No-op if `key` is already cached: the first value written wins.
    pub fn set(&self, key: BlockKey, value: Bytes) {
        let mut inner = self.inner.lock();
        let admission = inner.admit(key, value, SegmentKind::Frequency);
        if admission.admitted {
            debug!(key, "Stored block in frequency segment");
        }
        self.record(&admission, SegmentKind::Frequency);
    }

    /// Whether `key` is resident. Does not promote or fetch.
    pub fn contains(&self, key: BlockKey) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn segment_of(&self, key: BlockKey) -> Option<SegmentKind> {
        self.inner.lock().segment_of(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Recency keys, most recent first.
    pub fn recency_keys(&self) -> Vec<BlockKey> {
        self.inner.lock().keys(SegmentKind::Recency)
    }

    /// Frequency keys, most recent first.
    pub fn frequency_keys(&self) -> Vec<BlockKey> {
        self.inner.lock().keys(SegmentKind::Frequency)
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verify index/segment consistency under the lock.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.inner.lock().check_invariants()
    }

    fn record(&self, admission: &Admission, segment: SegmentKind) {
        if !admission.admitted {
            return;
        }
        self.metrics.record_evictions(admission.evicted.len());
        if admission.overflow {
            self.metrics.capacity_overflows.inc();
        }
        self.metrics.record_admission(segment);
    }
}

impl<S: BackingStore> CacheHandle for BlockCache<S> {
    fn get(&self, key: BlockKey) -> Option<Bytes> {
        BlockCache::get(self, key)
    }

    fn set(&self, key: BlockKey, value: Bytes) {
        BlockCache::set(self, key, value)
    }

    fn stats(&self) -> CacheStats {
        BlockCache::stats(self)
    }

    fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}
