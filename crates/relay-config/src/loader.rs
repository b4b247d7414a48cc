use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, placeholder expansion
    /// fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// Runs at startup so bad settings fail before any traffic is served.
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured or a numeric setting
    /// is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }

        if self.rate_limit.enabled && (self.rate_limit.per_minute == 0 || self.rate_limit.per_hour == 0) {
            anyhow::bail!("rate limit maximums must be greater than 0 when rate limiting is enabled");
        }

        if self.cache.enabled && self.cache.ttl_seconds == 0 {
            anyhow::bail!("cache.ttl_seconds must be greater than 0 when caching is enabled");
        }

        if self.circuit_breaker.failure_threshold == 0 {
            anyhow::bail!("circuit_breaker.failure_threshold must be greater than 0");
        }

        if self.circuit_breaker.half_open_max_calls == 0 {
            anyhow::bail!("circuit_breaker.half_open_max_calls must be greater than 0");
        }

        if self.fallback.max_attempts == 0 {
            anyhow::bail!("fallback.max_attempts must be greater than 0");
        }

        if !self.fallback.backoff_base.is_finite() || self.fallback.backoff_base < 0.0 {
            anyhow::bail!("fallback.backoff_base must be a non-negative number");
        }

        // Unknown cost-order names are tolerated at runtime (the router
        // falls back to the first available provider), so only warn.
        for name in &self.routing.cost_order {
            if !self.providers.contains_key(name) {
                tracing::warn!(provider = %name, "cost_order references an unconfigured provider");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, ProviderConfig, ProviderType};

    fn minimal_config() -> Config {
        let mut config = Config::default();
        config.providers.insert(
            "openai".to_owned(),
            ProviderConfig {
                provider_type: ProviderType::OpenaiCompat,
                api_key: None,
                base_url: None,
                model: "gpt-4o-mini".to_owned(),
            },
        );
        config
    }

    #[test]
    fn minimal_config_validates() {
        minimal_config().validate().unwrap();
    }

    #[test]
    fn empty_providers_rejected() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("at least one provider"));
    }

    #[test]
    fn zero_failure_threshold_rejected() {
        let mut config = minimal_config();
        config.circuit_breaker.failure_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_ttl_rejected_only_when_cache_enabled() {
        let mut config = minimal_config();
        config.cache.ttl_seconds = 0;
        assert!(config.validate().is_err());

        config.cache.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn parses_full_toml() {
        let toml = r#"
            [providers.openai]
            type = "openai_compat"
            model = "gpt-4o-mini"

            [providers.deepseek]
            type = "openai_compat"
            base_url = "https://api.deepseek.com/v1"
            model = "deepseek-chat"

            [rate_limit]
            per_minute = 10
            per_hour = 100

            [cache]
            ttl_seconds = 120

            [circuit_breaker]
            failure_threshold = 3
            recovery_seconds = 30
            half_open_max_calls = 2

            [fallback]
            max_attempts = 2
            backoff_base = 1.5

            [routing]
            strategy = "cost"
            cost_order = ["deepseek", "openai"]
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.rate_limit.per_minute, 10);
        assert_eq!(config.cache.ttl_seconds, 120);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert!((config.fallback.backoff_base - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.routing.strategy, crate::RoutingStrategy::Cost);
    }

    #[test]
    fn defaults_applied_for_missing_sections() {
        let toml = r#"
            [providers.openai]
            type = "openai_compat"
            model = "gpt-4o-mini"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.per_minute, 60);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.fallback.max_attempts, 3);
        assert_eq!(config.routing.strategy, crate::RoutingStrategy::Auto);
    }
}
