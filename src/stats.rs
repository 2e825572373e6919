//! Statistics. The sole
//! in-memory shared mutable state in the indexing path.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

/// Accumulated counters and per-stage timings for one `index` run.
/// Printed by the `index` and `stats` CLI subcommands.
#[derive(Debug, Default, Clone)]
pub struct StatsSnapshot {
    pub found: u64,
    pub processed: u64,
    pub skipped: u64,
    pub updated: u64,
    pub failed: u64,
    pub failures_by_kind: BTreeMap<String, u64>,
    /// Cumulative per-stage timings, populated only when `perf_stats` is
    /// enabled.
    pub stage_timings: BTreeMap<String, Duration>,
}

/// Mutex-guarded statistics record. Workers take the lock only to update
/// counters — no other shared mutable state exists on the
/// indexing path.
#[derive(Default)]
pub struct Stats {
    inner: Mutex<StatsSnapshot>,
}

impl Stats {
    pub fn new() -> Self {
        Stats { inner: Mutex::new(StatsSnapshot::default()) }
    }

    pub fn record_found(&self, count: u64) {
        let mut s = self.inner.lock().unwrap();
        s.found += count;
    }

    pub fn record_processed(&self) {
        let mut s = self.inner.lock().unwrap();
        s.processed += 1;
    }

    pub fn record_skipped(&self) {
        let mut s = self.inner.lock().unwrap();
        s.skipped += 1;
    }

    pub fn record_updated(&self) {
        let mut s = self.inner.lock().unwrap();
        s.updated += 1;
    }

    pub fn record_failed(&self, kind: &str) {
        let mut s = self.inner.lock().unwrap();
        s.failed += 1;
        *s.failures_by_kind.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn record_stage_time(&self, stage: &str, elapsed: Duration) {
        let mut s = self.inner.lock().unwrap();
        let entry = s.stage_timings.entry(stage.to_string()).or_insert(Duration::ZERO);
        *entry += elapsed;
    }

    /// Total photos processed so far (for the "every 100 files" progress
    /// report).
    pub fn processed_count(&self) -> u64 {
        self.inner.lock().unwrap().processed
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_independently() {
        let stats = Stats::new();
        stats.record_found(10);
        stats.record_processed();
        stats.record_processed();
        stats.record_skipped();
        stats.record_failed("decode");
        stats.record_failed("decode");
        stats.record_failed("metadata");

        let snap = stats.snapshot();
        assert_eq!(snap.found, 10);
        assert_eq!(snap.processed, 2);
        assert_eq!(snap.skipped, 1);
        assert_eq!(snap.failed, 3);
        assert_eq!(snap.failures_by_kind.get("decode"), Some(&2));
        assert_eq!(snap.failures_by_kind.get("metadata"), Some(&1));
    }
}
