//! Per-provider request metrics for the gateway
//!
//! Tracks request/success/error counts, cumulative token usage, cache
//! hit/miss counters, and a bounded window of recent latency samples used
//! for the router's latency strategy.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

/// Latency samples retained per provider for the moving average
const LATENCY_WINDOW: usize = 1000;

#[derive(Default)]
struct ProviderSample {
    requests: u64,
    successes: u64,
    errors: u64,
    tokens: u64,
    latencies: VecDeque<u64>,
}

/// Snapshot of one provider's metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderMetrics {
    /// Provider name
    pub provider: String,
    /// Total requests recorded
    pub requests: u64,
    /// Successful requests
    pub successes: u64,
    /// Failed requests
    pub errors: u64,
    /// Cumulative token usage
    pub tokens: u64,
    /// Arithmetic mean of retained latency samples, 0 if none
    pub avg_latency_ms: f64,
}

/// Aggregate snapshot across all providers
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSummary {
    /// Total requests across providers
    pub total_requests: u64,
    /// Total errors across providers
    pub total_errors: u64,
    /// Total tokens across providers
    pub total_tokens: u64,
    /// hits / (hits + misses), 0 with no observations
    pub cache_hit_rate: f64,
    /// Per-provider breakdowns
    pub providers: Vec<ProviderMetrics>,
}

/// Metrics collector shared by the gateway's components
///
/// Each provider's sample is independently protected by its map shard;
/// cache counters are plain atomics. Disabled mode makes every recording
/// a no-op and every read zeroed.
pub struct MetricsCollector {
    samples: DashMap<String, ProviderSample>,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    enabled: bool,
}

impl MetricsCollector {
    /// Create a new collector
    pub fn new(enabled: bool) -> Self {
        Self {
            samples: DashMap::new(),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            enabled,
        }
    }

    /// Record one provider dispatch outcome
    ///
    /// The latency sample window is capped at 1000 entries; the oldest
    /// sample is dropped once the cap is exceeded. Cache-served responses
    /// go through [`Self::record_cache_hit`] instead so they never skew a
    /// provider's latency window.
    pub fn record_request(&self, provider: &str, latency_ms: u64, success: bool, tokens: u64) {
        if !self.enabled {
            return;
        }

        let mut sample = self.samples.entry(provider.to_owned()).or_default();
        sample.requests += 1;
        sample.tokens += tokens;
        if success {
            sample.successes += 1;
        } else {
            sample.errors += 1;
        }
        sample.latencies.push_back(latency_ms);
        if sample.latencies.len() > LATENCY_WINDOW {
            sample.latencies.pop_front();
        }
    }

    /// Count a response served from the cache
    pub fn record_cache_hit(&self) {
        if !self.enabled {
            return;
        }
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a cache-eligible request that missed
    pub fn record_cache_miss(&self) {
        if !self.enabled {
            return;
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot one provider's metrics
    ///
    /// Returns zeroed metrics for unknown providers or when disabled.
    pub fn provider_metrics(&self, provider: &str) -> ProviderMetrics {
        let mut metrics = ProviderMetrics {
            provider: provider.to_owned(),
            ..ProviderMetrics::default()
        };

        if !self.enabled {
            return metrics;
        }

        if let Some(sample) = self.samples.get(provider) {
            metrics.requests = sample.requests;
            metrics.successes = sample.successes;
            metrics.errors = sample.errors;
            metrics.tokens = sample.tokens;
            metrics.avg_latency_ms = mean(&sample.latencies);
        }

        metrics
    }

    /// Aggregate totals across all known providers
    pub fn summary(&self) -> MetricsSummary {
        if !self.enabled {
            return MetricsSummary::default();
        }

        let mut summary = MetricsSummary::default();

        for entry in &self.samples {
            summary.total_requests += entry.requests;
            summary.total_errors += entry.errors;
            summary.total_tokens += entry.tokens;
            summary.providers.push(ProviderMetrics {
                provider: entry.key().clone(),
                requests: entry.requests,
                successes: entry.successes,
                errors: entry.errors,
                tokens: entry.tokens,
                avg_latency_ms: mean(&entry.latencies),
            });
        }

        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        if hits + misses > 0 {
            #[allow(clippy::cast_precision_loss)]
            {
                summary.cache_hit_rate = hits as f64 / (hits + misses) as f64;
            }
        }

        summary
    }

    /// Clear all recorded state
    pub fn reset(&self) {
        self.samples.clear();
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(latencies: &VecDeque<u64>) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    let sum: u64 = latencies.iter().sum();
    sum as f64 / latencies.len() as f64
}
