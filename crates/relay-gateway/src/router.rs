//! Strategy-based provider selection
//!
//! Filters the adapter set through the circuit breaker, then picks one
//! provider to try first according to the effective strategy. Every
//! strategy degrades to "first available" rather than failing, so the
//! only selection error is the whole set being circuit-unavailable.

use std::sync::Arc;

use indexmap::IndexMap;
use relay_config::{RoutingConfig, RoutingStrategy};
use relay_metrics::MetricsCollector;

use crate::error::GatewayError;
use crate::health::CircuitBreaker;
use crate::provider::Provider;

/// Provider selector shared by all in-flight requests
pub struct Router {
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<MetricsCollector>,
    config: RoutingConfig,
}

impl Router {
    /// Create a new router
    pub fn new(breaker: Arc<CircuitBreaker>, metrics: Arc<MetricsCollector>, config: RoutingConfig) -> Self {
        Self {
            breaker,
            metrics,
            config,
        }
    }

    /// Choose the provider to try first
    ///
    /// `explicit` names a provider requested by the caller; `strategy`
    /// overrides the gateway-wide default for this request.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::NoProviderAvailable` if every adapter is
    /// currently circuit-unavailable
    pub fn select(
        &self,
        providers: &IndexMap<String, Arc<dyn Provider>>,
        explicit: Option<&str>,
        strategy: Option<RoutingStrategy>,
    ) -> Result<Arc<dyn Provider>, GatewayError> {
        let available: Vec<Arc<dyn Provider>> = providers
            .values()
            .filter(|p| self.breaker.is_available(p.name()))
            .map(Arc::clone)
            .collect();

        if available.is_empty() {
            return Err(GatewayError::NoProviderAvailable);
        }

        let effective = strategy.unwrap_or(self.config.strategy);
        let selected = if explicit.is_some() || effective == RoutingStrategy::Explicit {
            self.by_explicit(&available, explicit)
        } else {
            self.by_strategy(&available, effective)
        };

        tracing::debug!(
            provider = %selected.name(),
            strategy = ?effective,
            explicit = ?explicit,
            available = available.len(),
            "routing decision made"
        );

        Ok(selected)
    }

    fn by_strategy(&self, available: &[Arc<dyn Provider>], strategy: RoutingStrategy) -> Arc<dyn Provider> {
        match strategy {
            RoutingStrategy::Explicit => self.by_explicit(available, None),
            RoutingStrategy::Cost => self.by_cost(available),
            RoutingStrategy::Latency => self
                .by_latency(available)
                .unwrap_or_else(|| Arc::clone(&available[0])),
            RoutingStrategy::Load => self.by_load(available),
            // Prefer empirically fast providers once data exists, else
            // degrade to the static cost order
            RoutingStrategy::Auto => self.by_latency(available).unwrap_or_else(|| self.by_cost(available)),
        }
    }

    /// Return the named adapter, or the first available one when the
    /// name is absent or unknown
    fn by_explicit(&self, available: &[Arc<dyn Provider>], explicit: Option<&str>) -> Arc<dyn Provider> {
        explicit
            .and_then(|name| available.iter().find(|p| p.name() == name))
            .unwrap_or_else(|| &available[0])
            .clone()
    }

    /// First available adapter in the configured cheapest-first order
    fn by_cost(&self, available: &[Arc<dyn Provider>]) -> Arc<dyn Provider> {
        for name in &self.config.cost_order {
            if let Some(provider) = available.iter().find(|p| p.name() == name.as_str()) {
                return Arc::clone(provider);
            }
        }
        Arc::clone(&available[0])
    }

    /// Lowest observed mean latency among adapters with recorded data,
    /// `None` when no adapter has data yet
    fn by_latency(&self, available: &[Arc<dyn Provider>]) -> Option<Arc<dyn Provider>> {
        available
            .iter()
            .filter_map(|provider| {
                let metrics = self.metrics.provider_metrics(provider.name());
                (metrics.requests > 0).then_some((provider, metrics.avg_latency_ms))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(provider, _)| Arc::clone(provider))
    }

    /// Fewest recorded requests, ties broken by iteration order
    fn by_load(&self, available: &[Arc<dyn Provider>]) -> Arc<dyn Provider> {
        available
            .iter()
            .min_by_key(|provider| self.metrics.provider_metrics(provider.name()).requests)
            .map_or_else(|| Arc::clone(&available[0]), Arc::clone)
    }
}
