//! The segmented cache core: index plus recency and frequency segments.
//!
//! This type is not synchronized. [`BlockCache`](crate::cache::BlockCache)
//! wraps it in a mutex and adds the backing store.
//!
//! Invariants maintained by every method:
//! - a key is in at most one segment,
//! - the index holds exactly the keys of both segments,
//! - `len() <= capacity` except after an admission that found recency empty.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::entry::{CacheEntry, Location, SegmentKind};
use crate::cache::evictor::Evictor;
use crate::cache::segment::Segment;
use crate::store::BlockKey;

/// Point-in-time counters and sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub recency_len: usize,
    pub frequency_len: usize,
    pub hits: u64,
    pub misses: u64,
    pub fetch_failures: u64,
    pub evictions: u64,
    pub capacity_overflows: u64,
}

impl CacheStats {
    pub fn resident(&self) -> usize {
        self.recency_len + self.frequency_len
    }

    /// Hits as a fraction of lookups (0.0 - 1.0).
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }
        self.hits as f64 / lookups as f64
    }

    /// Combine stats from independent caches.
    pub fn merge(&self, other: &CacheStats) -> CacheStats {
        CacheStats {
            capacity: self.capacity + other.capacity,
            recency_len: self.recency_len + other.recency_len,
            frequency_len: self.frequency_len + other.frequency_len,
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            fetch_failures: self.fetch_failures + other.fetch_failures,
            evictions: self.evictions + other.evictions,
            capacity_overflows: self.capacity_overflows + other.capacity_overflows,
        }
    }
}

/// Result of admitting a new entry.
#[derive(Debug, Default)]
pub struct Admission {
    pub admitted: bool,
    pub evicted: Vec<BlockKey>,
    pub overflow: bool,
}

pub struct SegmentedCache {
    index: HashMap<BlockKey, Location>,
    recency: Segment,
    frequency: Segment,
    evictor: Evictor,
    stats: CacheStats,
}

impl SegmentedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity.min(1 << 16)),
            recency: Segment::new(),
            frequency: Segment::new(),
            evictor: Evictor::new(capacity),
            stats: CacheStats {
                capacity,
                ..Default::default()
            },
        }
    }

    pub fn capacity(&self) -> usize {
        self.evictor.capacity()
    }

    pub fn len(&self) -> usize {
        self.recency.len() + self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: BlockKey) -> bool {
        self.index.contains_key(&key)
    }

    pub fn segment_of(&self, key: BlockKey) -> Option<SegmentKind> {
        self.index.get(&key).map(|loc| loc.segment)
    }

    /// Look up `key`, moving it to the head of its segment on a hit.
    ///
    /// Hit and miss counters are updated here; a miss does not fetch.
    pub fn lookup(&mut self, key: BlockKey) -> Option<Bytes> {
        let Some(loc) = self.index.get(&key).copied() else {
            self.stats.misses += 1;
            return None;
        };

        let segment = self.segment_mut(loc.segment);
        segment.move_to_front(loc.slot);
        let value = segment.get(loc.slot).map(|e| e.value.clone());

        if value.is_some() {
            self.stats.hits += 1;
            debug!(key, segment = %loc.segment, "Cache hit");
        }
        value
    }

    /// Admit `key` at the head of `segment`, evicting from recency first if
    /// the cache is full. No-op when the key is already resident.
    pub fn admit(&mut self, key: BlockKey, value: Bytes, segment: SegmentKind) -> Admission {
        if self.index.contains_key(&key) {
            return Admission::default();
        }

        let mut admission = Admission {
            admitted: true,
            ..Default::default()
        };

        if self.evictor.needs_eviction(self.len()) {
            let round = self
                .evictor
                .make_room(&mut self.recency, self.frequency.len());

            for victim in &round.evicted {
                self.index.remove(&victim.key);
                debug!(key = victim.key, "Evicted from recency");
            }
            self.stats.evictions += round.evicted.len() as u64;
            admission.evicted = round.evicted.into_iter().map(|e| e.key).collect();

            if round.overflow {
                self.stats.capacity_overflows += 1;
                admission.overflow = true;
                warn!(
                    key,
                    capacity = self.capacity(),
                    frequency_len = self.frequency.len(),
                    "Recency segment exhausted, admitting over capacity"
                );
            }
        }

        let slot = self
            .segment_mut(segment)
            .push_front(CacheEntry::new(key, value));
        self.index.insert(key, Location { segment, slot });

        admission
    }

    pub fn record_fetch_failure(&mut self) {
        self.stats.fetch_failures += 1;
    }

    /// Keys of `segment` from head (most recent) to tail.
    pub fn keys(&self, segment: SegmentKind) -> Vec<BlockKey> {
        self.segment(segment).iter().map(|e| e.key).collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            recency_len: self.recency.len(),
            frequency_len: self.frequency.len(),
            ..self.stats
        }
    }

    /// Check that the index and segments agree. Used by tests.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.index.len() != self.len() {
            return Err(format!(
                "index has {} keys but segments hold {}",
                self.index.len(),
                self.len()
            ));
        }
        for kind in SegmentKind::ALL {
            for entry in self.segment(kind).iter() {
                match self.index.get(&entry.key) {
                    Some(loc) if loc.segment == kind => {}
                    Some(loc) => {
                        return Err(format!(
                            "key {} found in {kind} but indexed in {}",
                            entry.key, loc.segment
                        ))
                    }
                    None => return Err(format!("key {} in {kind} is not indexed", entry.key)),
                }
            }
        }
        Ok(())
    }

    fn segment(&self, kind: SegmentKind) -> &Segment {
        match kind {
            SegmentKind::Recency => &self.recency,
            SegmentKind::Frequency => &self.frequency,
        }
    }

    fn segment_mut(&mut self, kind: SegmentKind) -> &mut Segment {
        match kind {
            SegmentKind::Recency => &mut self.recency,
            SegmentKind::Frequency => &mut self.frequency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_admit_places_entry_in_requested_segment() {
        let mut cache = SegmentedCache::new(4);
        cache.admit(1, v("a"), SegmentKind::Frequency);
        cache.admit(2, v("b"), SegmentKind::Recency);

        assert_eq!(cache.segment_of(1), Some(SegmentKind::Frequency));
        assert_eq!(cache.segment_of(2), Some(SegmentKind::Recency));
        assert_eq!(cache.len(), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_admit_existing_key_is_noop() {
        let mut cache = SegmentedCache::new(4);
        assert!(cache.admit(1, v("a"), SegmentKind::Frequency).admitted);
        assert!(!cache.admit(1, v("b"), SegmentKind::Recency).admitted);

        assert_eq!(cache.lookup(1), Some(v("a")));
        assert_eq!(cache.segment_of(1), Some(SegmentKind::Frequency));
    }

    #[test]
    fn test_lookup_promotes_within_segment() {
        let mut cache = SegmentedCache::new(8);
        for k in 1..=3 {
            cache.admit(k, v("x"), SegmentKind::Recency);
        }
        assert_eq!(cache.keys(SegmentKind::Recency), vec![3, 2, 1]);

        cache.lookup(1);
        assert_eq!(cache.keys(SegmentKind::Recency), vec![1, 3, 2]);
        assert_eq!(cache.segment_of(1), Some(SegmentKind::Recency));
    }

    #[test]
    fn test_lookup_counts_hits_and_misses() {
        let mut cache = SegmentedCache::new(2);
        cache.admit(1, v("a"), SegmentKind::Recency);

        cache.lookup(1);
        cache.lookup(2);
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_ratio() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_full_cache_evicts_recency_tail() {
        let mut cache = SegmentedCache::new(2);
        cache.admit(1, v("a"), SegmentKind::Recency);
        cache.admit(2, v("b"), SegmentKind::Recency);

        let admission = cache.admit(3, v("c"), SegmentKind::Frequency);
        assert_eq!(admission.evicted, vec![1]);
        assert!(!admission.overflow);
        assert!(!cache.contains(1));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_frequency_only_cache_overflows() {
        let mut cache = SegmentedCache::new(2);
        cache.admit(1, v("a"), SegmentKind::Frequency);
        cache.admit(2, v("b"), SegmentKind::Frequency);

        let admission = cache.admit(3, v("c"), SegmentKind::Frequency);
        assert!(admission.admitted);
        assert!(admission.overflow);
        assert!(admission.evicted.is_empty());
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().capacity_overflows, 1);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_stats_merge() {
        let a = CacheStats {
            capacity: 2,
            hits: 3,
            recency_len: 1,
            ..Default::default()
        };
        let b = CacheStats {
            capacity: 3,
            misses: 4,
            frequency_len: 2,
            ..Default::default()
        };
        let merged = a.merge(&b);
        assert_eq!(merged.capacity, 5);
        assert_eq!(merged.hits, 3);
        assert_eq!(merged.misses, 4);
        assert_eq!(merged.resident(), 3);
    }
}
