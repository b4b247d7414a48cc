use serde::Deserialize;

/// Admission control configuration
///
/// Two independent trailing windows per caller identity; a request must
/// pass both to be admitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum requests in any trailing 60-second window
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
    /// Maximum requests in any trailing 3600-second window
    #[serde(default = "default_per_hour")]
    pub per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_per_minute() -> u32 {
    60
}

const fn default_per_hour() -> u32 {
    1000
}
