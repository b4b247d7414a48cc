use thiserror::Error;

/// Failure of a single provider attempt
///
/// Recovered locally by the fallback manager: the next candidate is tried
/// and only total exhaustion reaches the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport failure or provider-side error response
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The attempt exceeded the request's timeout budget
    #[error("provider call timed out after {0}s")]
    Timeout(u64),

    /// The provider answered with a body the adapter could not use
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced to the gateway's caller
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Caller exceeded their rate quota; never reaches a provider
    #[error("rate limit exceeded")]
    RateLimited {
        /// Seconds until the blocking window frees a slot
        retry_after: u64,
    },

    /// Every known adapter is circuit-unavailable
    #[error("no providers available")]
    NoProviderAvailable,

    /// A single provider attempt failed with fallback disabled
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Every fallback candidate was tried and failed
    #[error("all {attempts} provider attempts failed: {source}")]
    ProvidersExhausted {
        /// Providers actually attempted
        attempts: usize,
        /// The last concrete provider error
        source: ProviderError,
    },
}

impl GatewayError {
    /// Machine-readable error category for structured caller responses
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::RateLimited { .. } => "rate_limit_error",
            Self::NoProviderAvailable | Self::ProvidersExhausted { .. } => "service_unavailable_error",
            Self::Provider(_) => "upstream_error",
        }
    }

    /// Retry-after hint in seconds, when the error carries one
    pub const fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<relay_ratelimit::RateLimitError> for GatewayError {
    fn from(error: relay_ratelimit::RateLimitError) -> Self {
        let relay_ratelimit::RateLimitError::Exceeded { retry_after } = error;
        Self::RateLimited { retry_after }
    }
}
