//! Provider trait: the abstraction over completion services.
//!
//! A Provider takes a model name, an ordered message list, and sampling
//! parameters, and returns generated text plus the reason generation stopped.
//! The sequencer never looks behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// One completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-3.5-turbo", "gpt-4o")
    pub model: String,

    /// The messages, in the order the model should read them
    pub messages: Vec<Message>,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate; `None` leaves the service default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Why the service stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of the reply or a stop sequence.
    Stop,
    /// Truncated by the token limit.
    Length,
    ContentFilter,
    ToolCalls,
    FunctionCall,
    /// Absent or unrecognized.
    #[serde(other)]
    Unknown,
}

impl FinishReason {
    /// Map the service's raw `finish_reason` string.
    pub fn from_api(reason: Option<&str>) -> Self {
        match reason {
            Some("stop") => Self::Stop,
            Some("length") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            Some("tool_calls") => Self::ToolCalls,
            Some("function_call") => Self::FunctionCall,
            _ => Self::Unknown,
        }
    }

    /// Only a plain stop counts as a complete answer.
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Token usage information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A completed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub content: String,

    /// Completion-status signal
    pub finish_reason: FinishReason,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    /// A normally-stopped response; handy for stubs and tests.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            finish_reason: FinishReason::Stop,
            model: String::new(),
            usage: None,
        }
    }
}

/// The core Provider trait.
///
/// Every completion backend implements this trait. The sequencer calls
/// `complete()` without knowing which backend is in use.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a request and wait for the complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> std::result::Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}
