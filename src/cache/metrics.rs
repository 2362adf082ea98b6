//! Prometheus metrics for the block cache.
//!
//! Each [`CacheMetrics`] owns its own registry so independent caches (and
//! tests) never collide on metric names. Clones share the same series, which
//! is how the shards of a sharded cache report into one set.

use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::cache::entry::SegmentKind;

#[derive(Clone)]
pub struct CacheMetrics {
    registry: Arc<Registry>,
    pub hits: IntCounter,
    pub misses: IntCounter,
    pub fetch_failures: IntCounter,
    pub evictions: IntCounter,
    pub capacity_overflows: IntCounter,
    admissions: IntCounterVec,
    resident: IntGaugeVec,
}

impl CacheMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let hits = IntCounter::new("block_cache_hits_total", "Reads served from the cache")?;
        let misses = IntCounter::new(
            "block_cache_misses_total",
            "Reads that went to the backing store",
        )?;
        let fetch_failures = IntCounter::new(
            "block_cache_fetch_failures_total",
            "Backing store reads that failed and were reported as absent",
        )?;
        let evictions = IntCounter::new(
            "block_cache_evictions_total",
            "Entries evicted from the recency segment",
        )?;
        let capacity_overflows = IntCounter::new(
            "block_cache_capacity_overflows_total",
            "Admissions made over capacity because recency was empty",
        )?;
        let admissions = IntCounterVec::new(
            Opts::new("block_cache_admissions_total", "Entries admitted, by segment"),
            &["segment"],
        )?;
        let resident = IntGaugeVec::new(
            Opts::new("block_cache_resident_entries", "Resident entries, by segment"),
            &["segment"],
        )?;

        registry.register(Box::new(hits.clone()))?;
        registry.register(Box::new(misses.clone()))?;
        registry.register(Box::new(fetch_failures.clone()))?;
        registry.register(Box::new(evictions.clone()))?;
        registry.register(Box::new(capacity_overflows.clone()))?;
        registry.register(Box::new(admissions.clone()))?;
        registry.register(Box::new(resident.clone()))?;

        // Touch both label values so the series exist from the start.
        for segment in SegmentKind::ALL {
            admissions.with_label_values(&[segment.as_str()]);
            resident.with_label_values(&[segment.as_str()]);
        }

        Ok(Self {
            registry: Arc::new(registry),
            hits,
            misses,
            fetch_failures,
            evictions,
            capacity_overflows,
            admissions,
            resident,
        })
    }

    pub fn record_admission(&self, segment: SegmentKind) {
        self.admissions.with_label_values(&[segment.as_str()]).inc();
        self.resident.with_label_values(&[segment.as_str()]).inc();
    }

    pub fn record_evictions(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.evictions.inc_by(count as u64);
        self.resident
            .with_label_values(&[SegmentKind::Recency.as_str()])
            .sub(count as i64);
    }

    pub fn resident(&self, segment: SegmentKind) -> i64 {
        self.resident.with_label_values(&[segment.as_str()]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all series in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

impl std::fmt::Debug for CacheMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheMetrics")
            .field("hits", &self.hits.get())
            .field("misses", &self.misses.get())
            .field("evictions", &self.evictions.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_and_eviction_track_resident() {
        let metrics = CacheMetrics::new().unwrap();
        metrics.record_admission(SegmentKind::Recency);
        metrics.record_admission(SegmentKind::Recency);
        metrics.record_admission(SegmentKind::Frequency);
        metrics.record_evictions(1);

        assert_eq!(metrics.resident(SegmentKind::Recency), 1);
        assert_eq!(metrics.resident(SegmentKind::Frequency), 1);
        assert_eq!(metrics.evictions.get(), 1);
    }

    #[test]
    fn test_encode_exposes_series() {
        let metrics = CacheMetrics::new().unwrap();
        metrics.hits.inc();

        let text = metrics.encode().unwrap();
        assert!(text.contains("block_cache_hits_total 1"));
        assert!(text.contains("block_cache_resident_entries{segment=\"frequency\"} 0"));
    }
}
