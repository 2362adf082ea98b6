//! Integration tests for the eviction policy.

use bytes::Bytes;

use block_cache::cache::{BlockCache, SegmentKind};
use block_cache::store::SyntheticBlockStore;

fn synthetic_cache(capacity: usize) -> BlockCache<SyntheticBlockStore> {
    let store = SyntheticBlockStore::new(32, 1_000, std::time::Duration::ZERO);
    BlockCache::new(capacity, store).unwrap()
}

#[test]
fn test_eviction_order_lru_of_misses() {
    let n = 4;
    let cache = synthetic_cache(n);

    for k in 0..=n as u64 {
        cache.get(k);
    }

    // Key 0 was least recently accessed and is gone.
    assert!(!cache.contains(0));
    for k in 1..=n as u64 {
        assert!(cache.contains(k), "key {k} should still be resident");
    }

    let reads = cache.store().reads();
    for k in 1..=n as u64 {
        cache.get(k);
    }
    assert_eq!(cache.store().reads(), reads, "resident keys must be hits");

    cache.get(0);
    assert_eq!(cache.store().reads(), reads + 1);
}

#[test]
fn test_promotion_protects_recently_read_key() {
    let cache = synthetic_cache(3);
    cache.get(1);
    cache.get(2);
    cache.get(3);

    // Touch the oldest entry; 2 becomes the eviction candidate.
    cache.get(1);
    cache.get(4);

    assert!(cache.contains(1));
    assert!(!cache.contains(2));
    assert_eq!(cache.recency_keys(), vec![4, 1, 3]);
}

#[test]
fn test_eviction_never_touches_frequency() {
    let cache = synthetic_cache(3);
    cache.set(100, Bytes::from_static(b"pinned"));
    cache.get(1);
    cache.get(2);

    for k in 3..20 {
        cache.get(k);
        assert!(cache.contains(100));
        assert_eq!(cache.len(), 3);
    }
    assert_eq!(cache.frequency_keys(), vec![100]);
    assert_eq!(cache.stats().evictions, 17);
}

#[test]
fn test_frequency_growth_past_capacity_is_reported() {
    let cache = synthetic_cache(2);
    cache.get(1);
    cache.set(10, Bytes::from_static(b"a"));
    cache.set(11, Bytes::from_static(b"b")); // evicts 1
    assert!(!cache.contains(1));

    cache.set(12, Bytes::from_static(b"c")); // nothing left to evict
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.stats().capacity_overflows, 1);
    assert_eq!(cache.metrics().capacity_overflows.get(), 1);

    // A read miss now evicts nothing either, so the new entry overflows too.
    cache.get(5);
    assert_eq!(cache.segment_of(5), Some(SegmentKind::Recency));
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.stats().capacity_overflows, 2);
    cache.check_invariants().unwrap();
}

#[test]
fn test_miss_when_full_evicts_before_admitting() {
    let cache = synthetic_cache(2);
    cache.set(1, Bytes::from_static(b"a"));
    cache.get(2);

    cache.get(3);
    assert!(!cache.contains(2));
    assert!(cache.contains(3));
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.recency_keys(), vec![3]);
}
