use serde::Deserialize;

/// Provider selection strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingStrategy {
    /// Use the provider named in the request
    Explicit,
    /// First available provider in the configured cost order
    Cost,
    /// Lowest observed mean latency
    Latency,
    /// Fewest recorded requests
    Load,
    /// Latency when data exists, cost otherwise
    Auto,
}

/// Routing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Default strategy when the request does not override it
    #[serde(default = "default_strategy")]
    pub strategy: RoutingStrategy,
    /// Provider names ordered cheapest first, used by the cost strategy
    #[serde(default = "default_cost_order")]
    pub cost_order: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            cost_order: default_cost_order(),
        }
    }
}

const fn default_strategy() -> RoutingStrategy {
    RoutingStrategy::Auto
}

fn default_cost_order() -> Vec<String> {
    vec!["deepseek".to_owned(), "gemini".to_owned(), "openai".to_owned()]
}
