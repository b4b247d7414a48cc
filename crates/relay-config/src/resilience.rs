use serde::Deserialize;

/// Circuit breaker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    /// Whether the circuit breaker is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Consecutive failures before the circuit opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds an open circuit waits before allowing a probe
    #[serde(default = "default_recovery_seconds")]
    pub recovery_seconds: u64,
    /// Maximum probe calls while half-open
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            recovery_seconds: default_recovery_seconds(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

/// Fallback execution configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallbackConfig {
    /// Whether fallback to alternate providers is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum providers tried per request, primary included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base of the exponential inter-attempt backoff, in seconds
    #[serde(default = "default_backoff_base")]
    pub backoff_base: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            backoff_base: default_backoff_base(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_failure_threshold() -> u32 {
    5
}

const fn default_recovery_seconds() -> u64 {
    60
}

const fn default_half_open_max_calls() -> u32 {
    3
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_base() -> f64 {
    2.0
}
