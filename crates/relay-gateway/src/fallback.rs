//! Ordered provider execution with backoff and circuit bookkeeping
//!
//! Drives one request through the candidate list built by the gateway:
//! primary first, then the alternates. Every attempt's outcome feeds the
//! circuit breaker and the metrics collector; only total exhaustion
//! surfaces to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_config::FallbackConfig;
use relay_metrics::MetricsCollector;

use crate::error::{GatewayError, ProviderError};
use crate::health::{CircuitBreaker, CircuitState};
use crate::provider::Provider;
use crate::types::{CompletionRequest, CompletionResponse};

/// Executes a request against an ordered candidate list
pub struct FallbackManager {
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<MetricsCollector>,
    config: FallbackConfig,
}

impl FallbackManager {
    /// Create a new fallback manager
    pub fn new(breaker: Arc<CircuitBreaker>, metrics: Arc<MetricsCollector>, config: FallbackConfig) -> Self {
        Self {
            breaker,
            metrics,
            config,
        }
    }

    /// Try each candidate in order until one succeeds
    ///
    /// Candidates are skipped while circuit-unavailable and do not consume
    /// the attempt budget; `max_attempts` caps actual invocations. Before
    /// the candidate at position `i > 0` the task sleeps `backoff_base^(i-1)`
    /// seconds; the first attempt is immediate. A request timeout bounds
    /// each individual attempt, not the cumulative sequence.
    ///
    /// With fallback disabled only the primary is invoked, and its error
    /// propagates unchanged (circuit and metrics are still recorded so
    /// health signals stay accurate).
    ///
    /// # Errors
    ///
    /// `GatewayError::ProvidersExhausted` once every candidate has been
    /// tried and failed, or `GatewayError::NoProviderAvailable` if every
    /// candidate was skipped
    pub async fn execute(
        &self,
        candidates: &[Arc<dyn Provider>],
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, GatewayError> {
        if !self.config.enabled {
            let primary = candidates.first().ok_or(GatewayError::NoProviderAvailable)?;
            return self.attempt(primary, request).await.map_err(GatewayError::Provider);
        }

        let mut last_error: Option<ProviderError> = None;
        let mut attempts = 0_usize;

        for (position, candidate) in candidates.iter().enumerate() {
            if attempts >= self.config.max_attempts as usize {
                break;
            }

            let name = candidate.name();

            if !self.breaker.is_available(name) {
                tracing::debug!(provider = name, "skipping circuit-unavailable provider");
                continue;
            }

            if position > 0 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let delay = self.config.backoff_base.powi(position as i32 - 1);
                tracing::debug!(provider = name, delay_secs = delay, "backing off before fallback attempt");
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            }

            // Account the probe before the attempt so abandoned calls
            // still consume half-open budget
            if self.breaker.state(name) == CircuitState::HalfOpen {
                self.breaker.increment_half_open_calls(name);
            }

            attempts += 1;
            match self.attempt(candidate, request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!(provider = name, error = %e, "provider attempt failed");
                    last_error = Some(e);
                }
            }
        }

        last_error.map_or(Err(GatewayError::NoProviderAvailable), |source| {
            Err(GatewayError::ProvidersExhausted { attempts, source })
        })
    }

    /// One provider call with timeout enforcement and bookkeeping
    async fn attempt(
        &self,
        provider: &Arc<dyn Provider>,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let name = provider.name();
        let start = Instant::now();

        let result = match request.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, provider.complete(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
            },
            None => provider.complete(request).await,
        };

        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(response) => {
                self.breaker.record_success(name);
                self.metrics
                    .record_request(name, latency_ms, true, u64::from(response.usage.total_tokens));
            }
            Err(_) => {
                self.breaker.record_failure(name);
                self.metrics.record_request(name, latency_ms, false, 0);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use relay_config::CircuitBreakerConfig;

    use super::*;
    use crate::types::Usage;

    struct ScriptedProvider {
        name: &'static str,
        fail_first: u32,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(name: &'static str, fail_first: u32) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail_first,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "test-model"
        }

        fn supports_structured_output(&self) -> bool {
            true
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(ProviderError::Upstream("scripted failure".to_owned()))
            } else {
                Ok(CompletionResponse {
                    content: format!("reply from {}", self.name),
                    finish_reason: None,
                    usage: Usage::default(),
                    model: "test-model".to_owned(),
                    provider: self.name.to_owned(),
                })
            }
        }
    }

    fn manager(enabled: bool, max_attempts: u32, backoff_base: f64) -> FallbackManager {
        let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig {
            enabled: true,
            failure_threshold: 5,
            recovery_seconds: 60,
            half_open_max_calls: 2,
        }));
        let metrics = Arc::new(MetricsCollector::new(true));
        FallbackManager::new(
            breaker,
            metrics,
            FallbackConfig {
                enabled,
                max_attempts,
                backoff_base,
            },
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![],
            temperature: 0.7,
            max_tokens: None,
            structured_output: false,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn primary_success_stops_the_sequence() {
        let manager = manager(true, 3, 2.0);
        let primary = ScriptedProvider::new("a", 0);
        let backup = ScriptedProvider::new("b", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![primary.clone(), backup.clone()];

        let response = manager.execute(&candidates, &request()).await.unwrap();
        assert_eq!(response.provider, "a");
        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_primary_falls_back_in_order() {
        let manager = manager(true, 3, 2.0);
        let primary = ScriptedProvider::new("a", 10);
        let backup = ScriptedProvider::new("b", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![primary.clone(), backup.clone()];

        let response = manager.execute(&candidates, &request()).await.unwrap();
        assert_eq!(response.provider, "b");
        assert_eq!(primary.calls(), 1);
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_raises_once_with_last_error() {
        let manager = manager(true, 3, 2.0);
        let a = ScriptedProvider::new("a", 10);
        let b = ScriptedProvider::new("b", 10);
        let c = ScriptedProvider::new("c", 10);
        let candidates: Vec<Arc<dyn Provider>> = vec![a.clone(), b.clone(), c.clone()];

        let err = manager.execute(&candidates, &request()).await.unwrap_err();
        match err {
            GatewayError::ProvidersExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, ProviderError::Upstream(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_schedule_is_exponential() {
        let manager = manager(true, 3, 2.0);
        let a = ScriptedProvider::new("a", 10);
        let b = ScriptedProvider::new("b", 10);
        let c = ScriptedProvider::new("c", 10);
        let candidates: Vec<Arc<dyn Provider>> = vec![a, b, c];

        let start = tokio::time::Instant::now();
        let _ = manager.execute(&candidates, &request()).await;

        // No delay before a, 2^0 = 1s before b, 2^1 = 2s before c
        assert_eq!(start.elapsed().as_secs(), 3);
    }

    #[tokio::test]
    async fn max_attempts_caps_the_candidate_list() {
        let manager = manager(true, 1, 2.0);
        let a = ScriptedProvider::new("a", 10);
        let b = ScriptedProvider::new("b", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![a.clone(), b.clone()];

        let err = manager.execute(&candidates, &request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::ProvidersExhausted { attempts: 1, .. }));
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn circuit_unavailable_candidates_are_skipped() {
        let manager = manager(true, 3, 2.0);
        // Trip the breaker for "a" directly
        for _ in 0..5 {
            manager.breaker.record_failure("a");
        }

        let a = ScriptedProvider::new("a", 0);
        let b = ScriptedProvider::new("b", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![a.clone(), b.clone()];

        let response = manager.execute(&candidates, &request()).await.unwrap();
        assert_eq!(response.provider, "b");
        assert_eq!(a.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_candidates_do_not_consume_attempts() {
        let manager = manager(true, 2, 2.0);
        // Trip the breaker for "a" so it is skipped, not attempted
        for _ in 0..5 {
            manager.breaker.record_failure("a");
        }

        let a = ScriptedProvider::new("a", 0);
        let b = ScriptedProvider::new("b", 10);
        let c = ScriptedProvider::new("c", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![a.clone(), b.clone(), c.clone()];

        // The budget covers two invocations: b fails, c succeeds
        let response = manager.execute(&candidates, &request()).await.unwrap();
        assert_eq!(response.provider, "c");
        assert_eq!(a.calls(), 0);
        assert_eq!(b.calls(), 1);
        assert_eq!(c.calls(), 1);
    }

    #[tokio::test]
    async fn all_skipped_reports_no_provider() {
        let manager = manager(true, 3, 2.0);
        for _ in 0..5 {
            manager.breaker.record_failure("a");
        }

        let a = ScriptedProvider::new("a", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![a];

        let err = manager.execute(&candidates, &request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NoProviderAvailable));
    }

    #[tokio::test]
    async fn disabled_fallback_invokes_primary_once() {
        let manager = manager(false, 3, 2.0);
        let a = ScriptedProvider::new("a", 10);
        let b = ScriptedProvider::new("b", 0);
        let candidates: Vec<Arc<dyn Provider>> = vec![a.clone(), b.clone()];

        let err = manager.execute(&candidates, &request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Provider(ProviderError::Upstream(_))));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn per_attempt_timeout_counts_as_failure() {
        struct SlowProvider;

        #[async_trait]
        impl Provider for SlowProvider {
            fn name(&self) -> &str {
                "slow"
            }

            fn model(&self) -> &str {
                "test-model"
            }

            fn supports_structured_output(&self) -> bool {
                true
            }

            async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("sleep never completes in this test")
            }
        }

        let manager = manager(true, 3, 2.0);
        let candidates: Vec<Arc<dyn Provider>> = vec![Arc::new(SlowProvider)];

        let mut req = request();
        req.timeout = Some(Duration::from_secs(5));

        let err = manager.execute(&candidates, &req).await.unwrap_err();
        match err {
            GatewayError::ProvidersExhausted { source, .. } => {
                assert!(matches!(source, ProviderError::Timeout(5)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn success_and_failure_feed_the_breaker() {
        let manager = manager(true, 3, 2.0);
        let a = ScriptedProvider::new("a", 1);
        let candidates: Vec<Arc<dyn Provider>> = vec![a.clone()];

        // First call fails, second succeeds and resets the failure count
        let _ = manager.execute(&candidates, &request()).await;
        manager.execute(&candidates, &request()).await.unwrap();

        assert_eq!(manager.breaker.state("a"), CircuitState::Closed);
        let metrics = manager.metrics.provider_metrics("a");
        assert_eq!(metrics.requests, 2);
        assert_eq!(metrics.errors, 1);
    }
}
