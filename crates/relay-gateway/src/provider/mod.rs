//! Provider trait and the closed set of adapter implementations

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use relay_config::{Config, ProviderType};

use crate::error::ProviderError;
use crate::types::{CompletionRequest, CompletionResponse};

/// Trait implemented by each LLM provider backend
///
/// Normalizes one backend's call surface into a single asynchronous
/// completion operation. Concrete adapters are registered at startup;
/// the fixed set of provider names doubles as the key space for circuit
/// breaker state, metrics buckets, and the router's cost order.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable short provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// Model identifier this adapter targets
    fn model(&self) -> &str;

    /// Whether the backend honors forced structured/JSON output
    fn supports_structured_output(&self) -> bool;

    /// Send a non-streaming completion request
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

/// Construct all adapters named in the configuration
///
/// One match arm per `ProviderType` variant; adding a backend means
/// adding a variant and an arm here, not runtime reflection.
///
/// # Errors
///
/// Returns an error if any adapter fails to initialize
pub fn build_providers(config: &Config) -> anyhow::Result<IndexMap<String, Arc<dyn Provider>>> {
    let mut providers: IndexMap<String, Arc<dyn Provider>> = IndexMap::new();

    for (name, provider_config) in &config.providers {
        let provider: Arc<dyn Provider> = match provider_config.provider_type {
            ProviderType::OpenaiCompat => {
                Arc::new(openai::OpenAiCompatProvider::new(name.clone(), provider_config)?)
            }
        };

        tracing::debug!(provider = %name, model = %provider.model(), "registered provider adapter");
        providers.insert(name.clone(), provider);
    }

    Ok(providers)
}
