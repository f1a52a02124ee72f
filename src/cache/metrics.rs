//! Fusion Cache Metrics
//!
//! Lock-free counters for tier hits, misses and movement between tiers.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct FusionMetrics {
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    disk_hits: AtomicU64,
    disk_misses: AtomicU64,

    // Movement between tiers
    promotions: AtomicU64,
    demotions: AtomicU64,
    /// Values that fit no tier and were discarded
    dropped: AtomicU64,
}

impl FusionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memory_miss(&self) {
        self.memory_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disk_miss(&self) {
        self.disk_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_demotion(&self) {
        self.demotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let memory_hits = self.memory_hits.load(Ordering::Relaxed);
        let disk_hits = self.disk_hits.load(Ordering::Relaxed);
        // Every lookup either hits memory or falls through to a memory miss
        let lookups = memory_hits + self.memory_misses.load(Ordering::Relaxed);

        MetricsSnapshot {
            memory_hits,
            memory_misses: self.memory_misses.load(Ordering::Relaxed),
            disk_hits,
            disk_misses: self.disk_misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            hit_ratio: if lookups == 0 {
                0.0
            } else {
                (memory_hits + disk_hits) as f64 / lookups as f64
            },
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub disk_hits: u64,
    pub disk_misses: u64,
    pub promotions: u64,
    pub demotions: u64,
    pub dropped: u64,
    /// Fraction of lookups served by either tier (0.0 - 1.0)
    pub hit_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot() {
        let metrics = FusionMetrics::new();
        metrics.record_memory_hit();
        metrics.record_memory_miss();
        metrics.record_disk_hit();
        metrics.record_memory_miss();
        metrics.record_disk_miss();
        metrics.record_promotion();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.memory_hits, 1);
        assert_eq!(snapshot.memory_misses, 2);
        assert_eq!(snapshot.disk_hits, 1);
        assert_eq!(snapshot.promotions, 1);
        // 2 of 3 lookups served
        assert!((snapshot.hit_ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_fresh_metrics_are_zero() {
        let snapshot = FusionMetrics::new().snapshot();
        assert_eq!(snapshot.demotions, 0);
        assert_eq!(snapshot.dropped, 0);
        assert_eq!(snapshot.hit_ratio, 0.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = FusionMetrics::new();
        metrics.record_memory_hit();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["memory_hits"], 1);
    }
}
