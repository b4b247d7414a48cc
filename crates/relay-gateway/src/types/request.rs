use std::time::Duration;

use relay_config::RoutingStrategy;
use serde::Deserialize;

use super::message::{Message, Role};
use crate::error::GatewayError;

/// Normalized chat-completion request accepted by the gateway
///
/// The web front end deserializes client traffic into this shape; the
/// gateway treats it as the single entry-point payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages, oldest first
    pub messages: Vec<Message>,
    /// Target model name
    #[serde(default)]
    pub model: Option<String>,
    /// Explicit provider choice
    #[serde(default)]
    pub provider: Option<String>,
    /// Sampling temperature, bounded [0.0, 2.0]
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Maximum output tokens
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Force structured/JSON output
    #[serde(default)]
    pub structured_output: bool,
    /// Whether this request may be served from and stored to the cache
    #[serde(default = "default_true")]
    pub use_cache: bool,
    /// Per-request routing strategy override
    #[serde(default)]
    pub strategy: Option<RoutingStrategy>,
    /// Caller identity for admission control
    #[serde(default)]
    pub identity: Option<String>,
    /// Per-attempt timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ChatRequest {
    /// Check the request invariants
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidRequest` if no message is present,
    /// the temperature is out of bounds, or `max_tokens` is zero
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.messages.is_empty() {
            return Err(GatewayError::InvalidRequest("at least one message is required".to_owned()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(GatewayError::InvalidRequest(format!(
                "temperature {} outside [0.0, 2.0]",
                self.temperature
            )));
        }

        if self.max_tokens == Some(0) {
            return Err(GatewayError::InvalidRequest("max_tokens must be positive".to_owned()));
        }

        Ok(())
    }

    /// Content of the first system message, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Per-attempt timeout as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Normalized payload handed to a provider adapter
///
/// Carries only what the adapter contract needs; the gateway-level
/// routing fields stay behind.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Conversation messages
    pub messages: Vec<Message>,
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum output tokens
    pub max_tokens: Option<u32>,
    /// Force structured/JSON output
    pub structured_output: bool,
    /// Per-attempt timeout
    pub timeout: Option<Duration>,
}

impl From<&ChatRequest> for CompletionRequest {
    fn from(request: &ChatRequest) -> Self {
        Self {
            messages: request.messages.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            structured_output: request.structured_output,
            timeout: request.timeout(),
        }
    }
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            messages: vec![Message::new(Role::User, "hello")],
            model: None,
            provider: None,
            temperature: 0.7,
            max_tokens: None,
            structured_output: false,
            use_cache: true,
            strategy: None,
            identity: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn valid_request_passes() {
        request().validate().unwrap();
    }

    #[test]
    fn empty_messages_rejected() {
        let mut req = request();
        req.messages.clear();
        assert!(req.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let mut req = request();
        req.temperature = 2.5;
        assert!(req.validate().is_err());

        req.temperature = -0.1;
        assert!(req.validate().is_err());
    }

    #[test]
    fn zero_max_tokens_rejected() {
        let mut req = request();
        req.max_tokens = Some(0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn system_prompt_found() {
        let mut req = request();
        req.messages.insert(0, Message::new(Role::System, "be brief"));
        assert_eq!(req.system_prompt(), Some("be brief"));
    }

    #[test]
    fn deserializes_with_defaults() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hi"}]}"#).unwrap();
        assert!((req.temperature - 0.7).abs() < f64::EPSILON);
        assert!(req.use_cache);
        assert!(req.strategy.is_none());
    }
}
