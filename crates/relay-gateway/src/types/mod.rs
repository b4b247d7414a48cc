//! Canonical request and response types for the gateway

mod message;
mod request;
mod response;

pub use message::{Message, Role};
pub use request::{ChatRequest, CompletionRequest};
pub use response::{ChatResponse, Choice, ChoiceMessage, CompletionResponse, FinishReason, Usage};
