//! Per-provider availability tracking with circuit breaker pattern
//!
//! Tracks consecutive failures per provider and stops sending traffic to
//! a consistently failing backend, allowing it limited probe traffic
//! after a recovery period.

use std::time::Instant;

use dashmap::DashMap;
use relay_config::CircuitBreakerConfig;
use serde::Serialize;

/// Circuit breaker state for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation, requests flow through
    Closed,
    /// Provider is failing, requests are blocked
    Open,
    /// Probing with limited traffic to test recovery
    HalfOpen,
}

/// Per-provider circuit record
///
/// Created lazily on first outcome, lives for the process lifetime, and
/// is mutated only through the breaker's transition methods.
struct CircuitRecord {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    half_open_calls: u32,
}

impl Default for CircuitRecord {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure: None,
            half_open_calls: 0,
        }
    }
}

/// Circuit breaker consulted by the router and driven by the fallback
/// manager
///
/// Each provider's record is independently protected by its map shard;
/// no transition takes a lock shared across providers.
pub struct CircuitBreaker {
    records: DashMap<String, CircuitRecord>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    /// Create a new breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            records: DashMap::new(),
            config,
        }
    }

    /// Whether a provider may receive a request right now
    ///
    /// An open circuit whose recovery timeout has elapsed transitions to
    /// half-open on this check, with its probe counter reset. While
    /// half-open, availability holds only below the probe call cap.
    /// Always true when the breaker is disabled.
    pub fn is_available(&self, provider: &str) -> bool {
        if !self.config.enabled {
            return true;
        }

        let Some(mut record) = self.records.get_mut(provider) else {
            return true;
        };

        match record.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = record
                    .last_failure
                    .is_some_and(|at| at.elapsed().as_secs() >= self.config.recovery_seconds);
                if recovered {
                    record.state = CircuitState::HalfOpen;
                    record.half_open_calls = 0;
                    drop(record);
                    tracing::info!(provider, "circuit half-open, probing provider");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => record.half_open_calls < self.config.half_open_max_calls,
        }
    }

    /// Current state without side effects
    ///
    /// Reports half-open for an open circuit whose recovery timeout has
    /// elapsed, but performs no transition.
    pub fn state(&self, provider: &str) -> CircuitState {
        if !self.config.enabled {
            return CircuitState::Closed;
        }

        let Some(record) = self.records.get(provider) else {
            return CircuitState::Closed;
        };

        if record.state == CircuitState::Open {
            let recovered = record
                .last_failure
                .is_some_and(|at| at.elapsed().as_secs() >= self.config.recovery_seconds);
            if recovered {
                return CircuitState::HalfOpen;
            }
        }

        record.state
    }

    /// Account one dispatched probe while half-open
    pub fn increment_half_open_calls(&self, provider: &str) {
        if !self.config.enabled {
            return;
        }

        if let Some(mut record) = self.records.get_mut(provider)
            && record.state == CircuitState::HalfOpen
        {
            record.half_open_calls += 1;
        }
    }

    /// Record a successful request to a provider
    pub fn record_success(&self, provider: &str) {
        if !self.config.enabled {
            return;
        }

        let mut record = self.records.entry(provider.to_owned()).or_default();
        match record.state {
            CircuitState::Closed => record.consecutive_failures = 0,
            CircuitState::HalfOpen => {
                record.state = CircuitState::Closed;
                record.consecutive_failures = 0;
                record.half_open_calls = 0;
                record.last_failure = None;
                drop(record);
                tracing::info!(provider, "circuit closed after successful probe");
            }
            // A stale success from an abandoned call; the circuit stays
            // open until the recovery timeout elapses
            CircuitState::Open => {}
        }
    }

    /// Record a failed request to a provider
    pub fn record_failure(&self, provider: &str) {
        if !self.config.enabled {
            return;
        }

        let mut record = self.records.entry(provider.to_owned()).or_default();
        match record.state {
            CircuitState::Closed => {
                record.consecutive_failures += 1;
                if record.consecutive_failures >= self.config.failure_threshold {
                    record.state = CircuitState::Open;
                    record.last_failure = Some(Instant::now());
                    let failures = record.consecutive_failures;
                    drop(record);
                    tracing::warn!(provider, consecutive_failures = failures, "circuit opened for provider");
                } else {
                    record.last_failure = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                record.state = CircuitState::Open;
                record.last_failure = Some(Instant::now());
                record.half_open_calls = 0;
                drop(record);
                tracing::warn!(provider, "probe failed, circuit re-opened");
            }
            CircuitState::Open => record.last_failure = Some(Instant::now()),
        }
    }

    /// Force one provider's circuit back to closed
    pub fn reset(&self, provider: &str) {
        self.records.remove(provider);
    }

    /// Force every circuit back to closed
    pub fn reset_all(&self) {
        self.records.clear();
    }
}
