//! Cache entry types and segment identities.
//!
//! An entry is owned by exactly one segment. The index never holds the entry
//! itself, only a [`Location`] naming the segment and the slot inside it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cache::segment::SlotId;
use crate::store::BlockKey;

/// Which segment an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Entries admitted by a read miss. The only segment eviction drains.
    Recency,
    /// Entries admitted by an explicit `set`. Never evicted.
    Frequency,
}

impl SegmentKind {
    pub const ALL: [SegmentKind; 2] = [SegmentKind::Recency, SegmentKind::Frequency];

    /// Label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Recency => "recency",
            SegmentKind::Frequency => "frequency",
        }
    }

    /// Whether the eviction procedure may reclaim entries from this segment.
    pub fn is_evictable(&self) -> bool {
        matches!(self, SegmentKind::Recency)
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cached block. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: BlockKey,
    pub value: Bytes,
}

impl CacheEntry {
    pub fn new(key: BlockKey, value: Bytes) -> Self {
        Self { key, value }
    }
}

/// Where a key currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub segment: SegmentKind,
    pub slot: SlotId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_recency_is_evictable() {
        assert!(SegmentKind::Recency.is_evictable());
        assert!(!SegmentKind::Frequency.is_evictable());
    }

    #[test]
    fn test_segment_labels() {
        assert_eq!(SegmentKind::Recency.to_string(), "recency");
        assert_eq!(
            serde_json::to_string(&SegmentKind::Frequency).unwrap(),
            "\"frequency\""
        );
    }
}
