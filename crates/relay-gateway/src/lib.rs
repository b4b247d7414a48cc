#![allow(clippy::must_use_candidate, clippy::missing_const_for_fn)]

//! Routing and resilience core for the relay LLM gateway
//!
//! Orchestrates rate limiting, response caching, circuit breaking,
//! strategy-based routing, and provider fallback behind a single
//! [`Gateway`] entry point.

pub mod error;
mod fallback;
mod health;
pub mod provider;
mod router;
mod service;
pub mod types;

pub use error::{GatewayError, ProviderError};
pub use health::{CircuitBreaker, CircuitState};
pub use provider::{Provider, build_providers};
pub use service::{EnabledFeatures, Gateway, HealthReport, ProviderStatus};
pub use types::{ChatRequest, ChatResponse, CompletionRequest, CompletionResponse, Message, Role};
