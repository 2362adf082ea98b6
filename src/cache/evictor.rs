//! Eviction policy: decides which entries leave the cache to make room.
//!
//! Victims come only from the tail of the recency segment, least recently
//! used first. The frequency segment is never drained, so when recency runs
//! dry the cache admits over capacity and the round reports an overflow.

use crate::cache::entry::CacheEntry;
use crate::cache::segment::Segment;

/// Outcome of one eviction round.
#[derive(Debug, Default)]
pub struct EvictionRound {
    /// Entries removed from the recency tail, in eviction order.
    pub evicted: Vec<CacheEntry>,
    /// The bound still holds after draining recency.
    pub overflow: bool,
}

/// The eviction policy engine.
#[derive(Debug, Clone, Copy)]
pub struct Evictor {
    capacity: usize,
}

impl Evictor {
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether admitting one more entry requires eviction first.
    pub fn needs_eviction(&self, resident: usize) -> bool {
        resident >= self.capacity
    }

    /// Pop entries from the recency tail until there is room for one more
    /// entry, or recency is empty.
    pub fn make_room(&self, recency: &mut Segment, frequency_len: usize) -> EvictionRound {
        let mut round = EvictionRound::default();

        while self.needs_eviction(recency.len() + frequency_len) {
            match recency.pop_back() {
                Some(victim) => round.evicted.push(victim),
                None => break,
            }
        }

        round.overflow = self.needs_eviction(recency.len() + frequency_len);
        round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn recency_with(keys: &[u64]) -> Segment {
        let mut seg = Segment::new();
        for &k in keys {
            seg.push_front(CacheEntry::new(k, Bytes::new()));
        }
        seg
    }

    #[test]
    fn test_no_eviction_below_capacity() {
        let evictor = Evictor::new(4);
        let mut recency = recency_with(&[1, 2]);

        let round = evictor.make_room(&mut recency, 1);
        assert!(round.evicted.is_empty());
        assert!(!round.overflow);
        assert_eq!(recency.len(), 2);
    }

    #[test]
    fn test_evicts_lru_until_room() {
        let evictor = Evictor::new(3);
        // head..tail = 4, 3, 2, 1
        let mut recency = recency_with(&[1, 2, 3, 4]);

        let round = evictor.make_room(&mut recency, 0);
        let victims: Vec<u64> = round.evicted.iter().map(|e| e.key).collect();
        assert_eq!(victims, vec![1, 2]);
        assert!(!round.overflow);
        assert_eq!(recency.len(), 2);
    }

    #[test]
    fn test_overflow_when_recency_exhausted() {
        let evictor = Evictor::new(2);
        let mut recency = recency_with(&[7]);

        let round = evictor.make_room(&mut recency, 2);
        assert_eq!(round.evicted.len(), 1);
        assert!(round.overflow);
        assert!(recency.is_empty());
    }
}
