//! Catalogue Metrics
//!
//! Lock-free counters for the router's hot paths:
//! - Lookups, misses and auto-routed placements
//! - Registrations and deregistrations
//! - Route and driver cache effectiveness
//! - Lookup latency distribution (microseconds)

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

// ============================================================================
// Counter
// ============================================================================

/// A monotonically increasing atomic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a counter at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment by one
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by `n`
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Histogram
// ============================================================================

/// Bucketed latency histogram with integer bounds
#[derive(Debug)]
pub struct Histogram {
    /// Inclusive upper bound of each bucket; the last bucket also takes overflow
    bounds: Vec<u64>,
    counts: Vec<AtomicU64>,
    total: AtomicU64,
    sum: AtomicU64,
    max: AtomicU64,
}

impl Histogram {
    /// Create a histogram with the given bucket bounds (must be non-empty)
    #[must_use]
    pub fn new(bounds: Vec<u64>) -> Self {
        let bounds = if bounds.is_empty() { vec![u64::MAX] } else { bounds };
        let counts = bounds.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            bounds,
            counts,
            total: AtomicU64::new(0),
            sum: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Buckets suited to in-process lookups, in microseconds
    #[must_use]
    pub fn lookup_latency() -> Self {
        Self::new(vec![
            10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000, 50_000, 250_000,
        ])
    }

    /// Record one observation
    pub fn record(&self, value: u64) {
        let idx = self
            .bounds
            .iter()
            .position(|&b| value <= b)
            .unwrap_or(self.bounds.len() - 1);

        self.counts[idx].fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.max.fetch_max(value, Ordering::Relaxed);
    }

    /// Record a duration in microseconds
    pub fn record_duration(&self, elapsed: Duration) {
        self.record(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX));
    }

    /// Point-in-time copy of the histogram
    #[must_use]
    pub fn snapshot(&self) -> HistogramSnapshot {
        let total = self.total.load(Ordering::Relaxed);
        let sum = self.sum.load(Ordering::Relaxed);
        HistogramSnapshot {
            bounds: self.bounds.clone(),
            counts: self
                .counts
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            total,
            sum,
            max: self.max.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a [`Histogram`]
#[derive(Clone, Debug, Serialize)]
pub struct HistogramSnapshot {
    /// Bucket upper bounds
    pub bounds: Vec<u64>,
    /// Observations per bucket
    pub counts: Vec<u64>,
    /// Number of observations
    pub total: u64,
    /// Sum of observations
    pub sum: u64,
    /// Largest observation
    pub max: u64,
}

impl HistogramSnapshot {
    /// Upper bound of the bucket containing the `p` quantile (0.0..=1.0)
    #[must_use]
    pub fn percentile(&self, p: f64) -> u64 {
        if self.total == 0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target = ((self.total as f64 * p.clamp(0.0, 1.0)).ceil() as u64).max(1);

        let mut cumulative = 0u64;
        for (bound, count) in self.bounds.iter().zip(&self.counts) {
            cumulative += count;
            if cumulative >= target {
                return *bound;
            }
        }
        self.bounds.last().copied().unwrap_or(0)
    }

    /// Mean observation, zero when empty
    #[must_use]
    pub fn mean(&self) -> u64 {
        self.sum.checked_div(self.total).unwrap_or(0)
    }
}

// ============================================================================
// Catalogue Metrics
// ============================================================================

/// Counters shared by the router and the driver cache
#[derive(Debug)]
pub struct CatalogMetrics {
    /// Calls to `lookup`
    pub lookups: Counter,
    /// Lookups that found no catalogue entry
    pub lookup_misses: Counter,
    /// Lookups answered by an implicit registration
    pub auto_routes: Counter,
    /// Successful registrations, explicit or implicit
    pub registrations: Counter,
    /// Calls to `deregister`
    pub deregistrations: Counter,
    /// Route lookups served from the memoization cache
    pub route_cache_hits: Counter,
    /// Driver handles reused from the driver cache
    pub driver_cache_hits: Counter,
    /// Driver handles constructed by the factory
    pub driver_builds: Counter,
    /// Driver cache evictions
    pub driver_invalidations: Counter,
    /// End-to-end lookup latency in microseconds
    pub lookup_latency: Histogram,
}

impl Default for CatalogMetrics {
    fn default() -> Self {
        Self {
            lookups: Counter::new(),
            lookup_misses: Counter::new(),
            auto_routes: Counter::new(),
            registrations: Counter::new(),
            deregistrations: Counter::new(),
            route_cache_hits: Counter::new(),
            driver_cache_hits: Counter::new(),
            driver_builds: Counter::new(),
            driver_invalidations: Counter::new(),
            lookup_latency: Histogram::lookup_latency(),
        }
    }
}

impl CatalogMetrics {
    /// Create zeroed metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of every counter
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lookups: self.lookups.get(),
            lookup_misses: self.lookup_misses.get(),
            auto_routes: self.auto_routes.get(),
            registrations: self.registrations.get(),
            deregistrations: self.deregistrations.get(),
            route_cache_hits: self.route_cache_hits.get(),
            driver_cache_hits: self.driver_cache_hits.get(),
            driver_builds: self.driver_builds.get(),
            driver_invalidations: self.driver_invalidations.get(),
            lookup_latency: self.lookup_latency.snapshot(),
        }
    }
}

/// Serializable copy of [`CatalogMetrics`]
#[derive(Clone, Debug, Serialize)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub lookups: u64,
    pub lookup_misses: u64,
    pub auto_routes: u64,
    pub registrations: u64,
    pub deregistrations: u64,
    pub route_cache_hits: u64,
    pub driver_cache_hits: u64,
    pub driver_builds: u64,
    pub driver_invalidations: u64,
    pub lookup_latency: HistogramSnapshot,
}
