//! Cache counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache metrics.
#[derive(Debug, Default)]
pub struct CacheStats {
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    misses: AtomicU64,
    stale_reads: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
    failed_writes: AtomicU64,
    serialization_errors: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    alerts_triggered: AtomicU64,
    alerts_suppressed: AtomicU64,
}

impl CacheStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn l1_hit(&self) {
        self.l1_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn l2_hit(&self) {
        self.l2_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read answered with stale data.
    pub fn stale_read(&self) {
        self.stale_reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` rates written.
    pub fn sets(&self, count: u64) {
        self.sets.fetch_add(count, Ordering::Relaxed);
    }

    pub fn delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed store read. The read itself is counted by its outcome.
    pub fn error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a write, delete or clear that did not reach the store.
    pub fn write_failed(&self) {
        self.failed_writes.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a corrupt cached payload.
    pub fn serialization_error(&self) {
        self.serialization_errors.fetch_add(1, Ordering::Relaxed);
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn alert_triggered(&self) {
        self.alerts_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn alert_suppressed(&self) {
        self.alerts_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_reads: self.stale_reads.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            failed_writes: self.failed_writes.load(Ordering::Relaxed),
            serialization_errors: self.serialization_errors.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            alerts_triggered: self.alerts_triggered.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let counters = [
            ("l1_hits", "Reads answered by the in-process tier", s.l1_hits),
            ("l2_hits", "Reads answered by the distributed tier", s.l2_hits),
            ("misses", "Reads that found no rate", s.misses),
            ("stale_reads", "Reads answered with stale data", s.stale_reads),
            ("sets", "Rates written", s.sets),
            ("deletes", "Rates deleted", s.deletes),
            ("errors", "Failed store operations", s.errors),
            ("failed_writes", "Writes that did not reach the store", s.failed_writes),
            ("evictions", "L1 capacity evictions", s.evictions),
            ("invalidations", "L1 entries dropped by remote updates", s.invalidations),
            ("alerts_triggered", "Alerts fired", s.alerts_triggered),
            ("alerts_suppressed", "Alerts suppressed by notification delay", s.alerts_suppressed),
        ];

        counters
            .iter()
            .map(|(name, help, value)| {
                format!(
                    "# HELP fxrate_cache_{name} {help}\n# TYPE fxrate_cache_{name} counter\nfxrate_cache_{name} {value}\n"
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStatsSnapshot {
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub misses: u64,
    pub stale_reads: u64,
    pub sets: u64,
    pub deletes: u64,
    pub errors: u64,
    pub failed_writes: u64,
    pub serialization_errors: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub alerts_triggered: u64,
    pub alerts_suppressed: u64,
}

impl CacheStatsSnapshot {
    /// Total reads.
    pub fn reads(&self) -> u64 {
        self.l1_hits + self.l2_hits + self.misses
    }

    /// Fraction of reads answered from either tier.
    pub fn hit_rate(&self) -> f64 {
        match self.reads() {
            0 => 0.0,
            reads => (self.l1_hits + self.l2_hits) as f64 / reads as f64,
        }
    }

    /// Operations attempted, successful or not.
    pub fn operations(&self) -> u64 {
        self.reads() + self.stale_reads + self.sets + self.deletes + self.failed_writes
    }

    /// Fraction of attempted operations that failed.
    pub fn error_rate(&self) -> f64 {
        let operations = self.operations();
        match operations {
            0 => 0.0,
            ops => self.errors as f64 / ops as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_rates() {
        let stats = CacheStats::new();
        stats.l1_hit();
        stats.l2_hit();
        stats.miss();
        stats.miss();
        stats.sets(4);
        stats.error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.reads(), 4);
        assert_eq!(snapshot.hit_rate(), 0.5);
        assert_eq!(snapshot.error_rate(), 1.0 / 8.0);
    }

    #[test]
    fn test_failed_writes_count_as_operations() {
        let stats = CacheStats::new();
        for _ in 0..10 {
            stats.write_failed();
        }
        assert_eq!(stats.snapshot().error_rate(), 1.0);

        stats.sets(1);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.operations(), 11);
        assert_eq!(snapshot.error_rate(), 10.0 / 11.0);
    }

    #[test]
    fn test_degraded_reads_stay_bounded() {
        let stats = CacheStats::new();
        stats.error();
        stats.stale_read();
        stats.error();
        stats.miss();
        stats.l1_hit();
        stats.l1_hit();

        assert_eq!(stats.snapshot().error_rate(), 0.5);
    }

    #[test]
    fn test_prometheus_export() {
        let stats = CacheStats::new();
        stats.sets(3);

        let output = stats.to_prometheus();
        assert!(output.contains("fxrate_cache_sets 3"));
        assert!(output.contains("# TYPE fxrate_cache_l1_hits counter"));
    }
}
