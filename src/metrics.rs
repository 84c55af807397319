//! Search Metrics
//!
//! Search counters per backend and latency tracking.

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::backend::Backend;

/// Metrics collector
#[derive(Debug)]
pub struct SearchMetrics {
    /// Total searches served (including empty ones)
    total_searches: AtomicU64,

    /// Searches that returned before invoking any backend
    empty_searches: AtomicU64,

    /// Kernel runs per backend
    searches_by_backend: RwLock<HashMap<Backend, u64>>,

    /// Backend failures recovered by falling back
    fallbacks: AtomicU64,

    /// Matrix cache rebuilds
    cache_rebuilds: AtomicU64,

    /// Latency tracking (simplified)
    latency_sum_us: AtomicU64,
    latency_count: AtomicU64,
    latency_min_us: AtomicU64,
    latency_max_us: AtomicU64,
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            total_searches: AtomicU64::new(0),
            empty_searches: AtomicU64::new(0),
            searches_by_backend: RwLock::new(HashMap::new()),
            fallbacks: AtomicU64::new(0),
            cache_rebuilds: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            latency_min_us: AtomicU64::new(u64::MAX),
            latency_max_us: AtomicU64::new(0),
        }
    }

    /// Record a search that ran a kernel on `backend`
    pub fn record_search(&self, backend: Backend, latency: Duration) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        *self.searches_by_backend.write().entry(backend).or_insert(0) += 1;
        self.record_latency(latency);
    }

    /// Record a search that found nothing to score
    pub fn record_empty_search(&self, latency: Duration) {
        self.total_searches.fetch_add(1, Ordering::Relaxed);
        self.empty_searches.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency);
    }

    pub fn record_fallbacks(&self, count: usize) {
        if count > 0 {
            self.fallbacks.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn record_cache_rebuild(&self) {
        self.cache_rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency: Duration) {
        let latency_us = latency.as_micros() as u64;
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        self.latency_min_us.fetch_min(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Get total searches count
    pub fn total_searches(&self) -> u64 {
        self.total_searches.load(Ordering::Relaxed)
    }

    pub fn empty_searches(&self) -> u64 {
        self.empty_searches.load(Ordering::Relaxed)
    }

    /// Kernel runs on one backend
    pub fn searches_on(&self, backend: Backend) -> u64 {
        self.searches_by_backend.read().get(&backend).copied().unwrap_or(0)
    }

    /// Get kernel runs by backend
    pub fn searches_by_backend(&self) -> HashMap<Backend, u64> {
        self.searches_by_backend.read().clone()
    }

    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn cache_rebuilds(&self) -> u64 {
        self.cache_rebuilds.load(Ordering::Relaxed)
    }

    /// Get average latency in microseconds
    pub fn avg_latency_us(&self) -> f64 {
        let count = self.latency_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        sum as f64 / count as f64
    }

    /// Get min latency in microseconds
    pub fn min_latency_us(&self) -> u64 {
        let min = self.latency_min_us.load(Ordering::Relaxed);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    /// Get max latency in microseconds
    pub fn max_latency_us(&self) -> u64 {
        self.latency_max_us.load(Ordering::Relaxed)
    }

    /// Get a summary of metrics
    pub fn summary(&self) -> String {
        format!(
            "Searches: {} (empty {}, fallbacks {}, rebuilds {}) | Latency (µs): avg={:.1}, min={}, max={}",
            self.total_searches(),
            self.empty_searches(),
            self.fallbacks(),
            self.cache_rebuilds(),
            self.avg_latency_us(),
            self.min_latency_us(),
            self.max_latency_us()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = SearchMetrics::new();

        metrics.record_search(Backend::Cpu, Duration::from_micros(100));
        metrics.record_search(Backend::Cpu, Duration::from_micros(200));
        metrics.record_search(Backend::Rayon, Duration::from_micros(150));
        metrics.record_empty_search(Duration::from_micros(150));
        metrics.record_fallbacks(0);
        metrics.record_fallbacks(2);

        assert_eq!(metrics.total_searches(), 4);
        assert_eq!(metrics.empty_searches(), 1);
        assert_eq!(metrics.fallbacks(), 2);
        assert_eq!(metrics.min_latency_us(), 100);
        assert_eq!(metrics.max_latency_us(), 200);
        assert!((metrics.avg_latency_us() - 150.0).abs() < 0.1);

        let by_backend = metrics.searches_by_backend();
        assert_eq!(by_backend.get(&Backend::Cpu), Some(&2));
        assert_eq!(metrics.searches_on(Backend::Rayon), 1);
        assert_eq!(metrics.searches_on(Backend::Pool), 0);
    }

    #[test]
    fn test_empty_summary() {
        let metrics = SearchMetrics::default();
        assert_eq!(metrics.min_latency_us(), 0);
        assert!(metrics.summary().starts_with("Searches: 0"));
    }
}
