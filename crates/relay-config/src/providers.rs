use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Configuration for a single LLM provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider protocol type
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model identifier sent to the provider
    pub model: String,
}

/// Supported provider protocols
///
/// A closed set: adding a backend means adding one variant here and one
/// arm to the gateway's construction match.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    /// OpenAI-compatible chat completions API (OpenAI, DeepSeek, ...)
    OpenaiCompat,
}
