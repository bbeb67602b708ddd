//! Counters for refresh and API monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Service metrics.
pub struct Metrics {
    /// Refresh cycles started.
    pub refreshes_total: AtomicU64,
    /// Refresh cycles that committed.
    pub refreshes_success: AtomicU64,
    /// Refresh cycles aborted by an external source.
    pub refreshes_failed: AtomicU64,
    /// Refresh requests turned away because one was running.
    pub refreshes_rejected: AtomicU64,
    /// Records created by refreshes.
    pub countries_inserted: AtomicU64,
    /// Records overwritten by refreshes.
    pub countries_updated: AtomicU64,
    /// Records removed through the API.
    pub countries_deleted: AtomicU64,
    /// Persisted record count after the last refresh or delete.
    pub countries_stored: AtomicU64,
    /// Duration of the last successful refresh.
    pub last_refresh_millis: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            refreshes_total: AtomicU64::new(0),
            refreshes_success: AtomicU64::new(0),
            refreshes_failed: AtomicU64::new(0),
            refreshes_rejected: AtomicU64::new(0),
            countries_inserted: AtomicU64::new(0),
            countries_updated: AtomicU64::new(0),
            countries_deleted: AtomicU64::new(0),
            countries_stored: AtomicU64::new(0),
            last_refresh_millis: AtomicU64::new(0),
        }
    }

    /// Set the stored-country gauge, e.g. from the store at startup.
    pub fn set_countries_stored(&self, count: u64) {
        self.countries_stored.store(count, Ordering::Relaxed);
    }

    pub fn refresh_started(&self) {
        self.refreshes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a committed refresh.
    pub fn refresh_succeeded(&self, inserted: u64, updated: u64, stored: u64, millis: u64) {
        self.refreshes_success.fetch_add(1, Ordering::Relaxed);
        self.countries_inserted.fetch_add(inserted, Ordering::Relaxed);
        self.countries_updated.fetch_add(updated, Ordering::Relaxed);
        self.countries_stored.store(stored, Ordering::Relaxed);
        self.last_refresh_millis.store(millis, Ordering::Relaxed);
    }

    pub fn refresh_failed(&self) {
        self.refreshes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn refresh_rejected(&self) {
        self.refreshes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an API delete.
    pub fn country_deleted(&self) {
        self.countries_deleted.fetch_add(1, Ordering::Relaxed);
        // saturating: a delete racing a fresh start must not wrap
        let _ = self
            .countries_stored
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            refreshes_total: self.refreshes_total.load(Ordering::Relaxed),
            refreshes_success: self.refreshes_success.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            refreshes_rejected: self.refreshes_rejected.load(Ordering::Relaxed),
            countries_inserted: self.countries_inserted.load(Ordering::Relaxed),
            countries_updated: self.countries_updated.load(Ordering::Relaxed),
            countries_deleted: self.countries_deleted.load(Ordering::Relaxed),
            countries_stored: self.countries_stored.load(Ordering::Relaxed),
            last_refresh_millis: self.last_refresh_millis.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus text format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let series: [(&str, &str, &str, u64); 9] = [
            ("refreshes_total", "counter", "Refresh cycles started", s.refreshes_total),
            ("refreshes_success", "counter", "Refresh cycles committed", s.refreshes_success),
            ("refreshes_failed", "counter", "Refresh cycles aborted", s.refreshes_failed),
            ("refreshes_rejected", "counter", "Refresh requests rejected while busy", s.refreshes_rejected),
            ("countries_inserted", "counter", "Countries created by refreshes", s.countries_inserted),
            ("countries_updated", "counter", "Countries overwritten by refreshes", s.countries_updated),
            ("countries_deleted", "counter", "Countries deleted through the API", s.countries_deleted),
            ("countries_stored", "gauge", "Countries currently stored", s.countries_stored),
            ("last_refresh_millis", "gauge", "Duration of the last successful refresh", s.last_refresh_millis),
        ];

        let mut out = String::new();
        for (name, kind, help, value) in series {
            out.push_str(&format!(
                "# HELP countryfx_{name} {help}\n# TYPE countryfx_{name} {kind}\ncountryfx_{name} {value}\n\n"
            ));
        }
        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub refreshes_total: u64,
    pub refreshes_success: u64,
    pub refreshes_failed: u64,
    pub refreshes_rejected: u64,
    pub countries_inserted: u64,
    pub countries_updated: u64,
    pub countries_deleted: u64,
    pub countries_stored: u64,
    pub last_refresh_millis: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
