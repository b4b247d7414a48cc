#![allow(clippy::must_use_candidate)]

pub mod cache;
mod env;
mod loader;
pub mod metrics;
pub mod providers;
pub mod rate_limit;
pub mod resilience;
pub mod routing;

use serde::Deserialize;

pub use cache::*;
pub use metrics::*;
pub use providers::*;
pub use rate_limit::*;
pub use resilience::*;
pub use routing::*;

/// Top-level Relay configuration
///
/// Built once at startup and passed by reference into each component's
/// constructor; nothing reads the environment after load.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Provider configurations keyed by name
    ///
    /// Insertion order is significant: it is the iteration order used for
    /// router tie-breaks and the default fallback candidate order.
    #[serde(default)]
    pub providers: indexmap::IndexMap<String, ProviderConfig>,
    /// Admission control configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Circuit breaker configuration
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    /// Fallback execution configuration
    #[serde(default)]
    pub fallback: FallbackConfig,
    /// Routing strategy configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Metrics collection configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}
