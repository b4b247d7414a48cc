//! Gateway orchestration: admission, cache, routing, fallback, shaping
//!
//! The single entry point the web front end calls. Wires the components
//! together per request and produces the uniform response or a
//! structured error.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use relay_cache::{CachedResponse, ResponseCache};
use relay_config::Config;
use relay_metrics::{MetricsCollector, MetricsSummary};
use relay_ratelimit::RequestLimiter;
use serde::Serialize;

use crate::error::GatewayError;
use crate::fallback::FallbackManager;
use crate::health::{CircuitBreaker, CircuitState};
use crate::provider::{self, Provider};
use crate::router::Router;
use crate::types::{ChatRequest, ChatResponse, Choice, ChoiceMessage, CompletionRequest, CompletionResponse};

/// Feature flags reported by `Gateway::health`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EnabledFeatures {
    /// Response caching
    pub cache: bool,
    /// Admission control
    pub rate_limit: bool,
    /// Fallback to alternate providers
    pub fallback: bool,
    /// Circuit breaker
    pub circuit_breaker: bool,
    /// Metrics collection
    pub metrics: bool,
}

/// Health report for the gateway instance
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status, always "ok" for a running instance
    pub status: &'static str,
    /// Configured provider names
    pub providers: Vec<String>,
    /// Which features are enabled
    pub features: EnabledFeatures,
}

/// Per-provider status for `Gateway::list_providers`
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    /// Provider name
    pub name: String,
    /// Model the adapter targets
    pub model: String,
    /// Whether the circuit currently admits traffic
    pub available: bool,
    /// Circuit breaker state
    pub circuit_state: CircuitState,
}

/// Shared state for the gateway's request handling
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    providers: IndexMap<String, Arc<dyn Provider>>,
    cache: ResponseCache,
    limiter: RequestLimiter,
    breaker: Arc<CircuitBreaker>,
    router: Router,
    fallback: FallbackManager,
    metrics: Arc<MetricsCollector>,
    features: EnabledFeatures,
}

impl Gateway {
    /// Build a gateway from configuration, constructing all adapters
    ///
    /// # Errors
    ///
    /// Returns an error if any provider adapter fails to initialize
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let providers = provider::build_providers(config)?;
        Ok(Self::with_providers(config, providers))
    }

    /// Build a gateway over an existing adapter set
    ///
    /// Used by `from_config` and by tests injecting mock adapters.
    pub fn with_providers(config: &Config, providers: IndexMap<String, Arc<dyn Provider>>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));
        let metrics = Arc::new(MetricsCollector::new(config.metrics.enabled));

        let router = Router::new(Arc::clone(&breaker), Arc::clone(&metrics), config.routing.clone());
        let fallback = FallbackManager::new(Arc::clone(&breaker), Arc::clone(&metrics), config.fallback.clone());
        let cache = ResponseCache::new(
            config.cache.enabled,
            std::time::Duration::from_secs(config.cache.ttl_seconds),
        );
        let limiter = RequestLimiter::new(config.rate_limit.clone());

        let features = EnabledFeatures {
            cache: config.cache.enabled,
            rate_limit: config.rate_limit.enabled,
            fallback: config.fallback.enabled,
            circuit_breaker: config.circuit_breaker.enabled,
            metrics: config.metrics.enabled,
        };

        Self {
            inner: Arc::new(GatewayInner {
                providers,
                cache,
                limiter,
                breaker,
                router,
                fallback,
                metrics,
                features,
            }),
        }
    }

    /// Handle one chat-completion request end to end
    ///
    /// Sequence: admission check, cache lookup, provider selection,
    /// fallback execution, cache store, response shaping.
    ///
    /// # Errors
    ///
    /// Returns a structured `GatewayError`; individual provider failures
    /// are recovered internally and never surface on their own
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let start = Instant::now();
        request.validate()?;

        let identity = request.identity.as_deref().unwrap_or("anonymous");
        self.inner.limiter.check(identity)?;

        let fingerprint = request.use_cache.then(|| fingerprint_for(&request));

        if let Some(fingerprint) = &fingerprint
            && let Some(hit) = self.inner.cache.get(fingerprint)
            && let Ok(mut response) = serde_json::from_str::<ChatResponse>(&hit.body)
        {
            response.cached = true;
            response.latency_ms = elapsed_ms(start);
            // Counted as a hit only; no provider dispatch happened, so no
            // latency sample is recorded for the provider
            self.inner.metrics.record_cache_hit();
            tracing::info!(provider = %response.provider, "served chat completion from cache");
            return Ok(response);
        }

        if fingerprint.is_some() {
            self.inner.metrics.record_cache_miss();
        }

        let primary = self
            .inner
            .router
            .select(&self.inner.providers, request.provider.as_deref(), request.strategy)?;

        // All other known adapters, in configured order, are alternates
        let mut candidates: Vec<Arc<dyn Provider>> = vec![Arc::clone(&primary)];
        candidates.extend(
            self.inner
                .providers
                .values()
                .filter(|p| p.name() != primary.name())
                .map(Arc::clone),
        );

        let completion_request = CompletionRequest::from(&request);
        let completion = self.inner.fallback.execute(&candidates, &completion_request).await?;

        let response = shape_response(completion, elapsed_ms(start));

        if let Some(fingerprint) = &fingerprint
            && let Ok(body) = serde_json::to_string(&response)
        {
            self.inner.cache.set(
                fingerprint,
                CachedResponse {
                    body,
                    model: response.model.clone(),
                    provider: response.provider.clone(),
                },
            );
        }

        tracing::info!(
            provider = %response.provider,
            model = %response.model,
            latency_ms = response.latency_ms,
            "chat completion served"
        );

        Ok(response)
    }

    /// Instance health and enabled feature set
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok",
            providers: self.inner.providers.keys().cloned().collect(),
            features: self.inner.features,
        }
    }

    /// Status of every configured provider
    pub fn list_providers(&self) -> Vec<ProviderStatus> {
        self.inner
            .providers
            .values()
            .map(|provider| {
                let state = self.inner.breaker.state(provider.name());
                ProviderStatus {
                    name: provider.name().to_owned(),
                    model: provider.model().to_owned(),
                    available: state != CircuitState::Open,
                    circuit_state: state,
                }
            })
            .collect()
    }

    /// Aggregate metrics snapshot
    pub fn metrics(&self) -> MetricsSummary {
        self.inner.metrics.summary()
    }

    /// Clear rate-limit windows for one identity
    pub fn reset_rate_limit(&self, identity: &str) {
        self.inner.limiter.reset(identity);
    }

    /// Force all circuits closed
    pub fn reset_circuits(&self) {
        self.inner.breaker.reset_all();
    }
}

/// Cache fingerprint for a gateway request
fn fingerprint_for(request: &ChatRequest) -> String {
    relay_cache::request_fingerprint(
        request
            .messages
            .iter()
            .map(|m| (m.role.as_str(), m.content.as_str())),
        request.model.as_deref(),
        request.temperature,
        request.max_tokens,
        request.system_prompt(),
    )
}

/// Build the uniform response from a provider completion
fn shape_response(completion: CompletionResponse, latency_ms: u64) -> ChatResponse {
    ChatResponse {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
        created: unix_now(),
        model: completion.model,
        provider: completion.provider,
        choices: vec![Choice {
            index: 0,
            message: ChoiceMessage::text(completion.content),
            finish_reason: completion.finish_reason,
        }],
        usage: completion.usage,
        cached: false,
        latency_ms,
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
