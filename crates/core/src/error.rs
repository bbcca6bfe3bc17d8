//! Error types for the promptseq domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all promptseq operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Prompt validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- A step of an execution failed ---
    #[error("{0}")]
    Step(#[from] StepFailure),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A raw prompt or request payload could not be turned into canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid role: {0}. Must be one of: system, assistant, user, function, tool")]
    InvalidRole(String),

    #[error("Prompt content is required")]
    MissingContent,

    #[error("Invalid {field}: '{value}' is not a valid number")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid {field}: '{value}' is not a boolean")]
    InvalidFlag { field: &'static str, value: String },

    #[error("{0}")]
    InvalidShape(String),

    #[error("Prompt {index}: {source}")]
    AtPrompt {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Attach the 1-based position of the offending prompt.
    pub fn at_prompt(self, index: usize) -> Self {
        Self::AtPrompt {
            index,
            source: Box::new(self),
        }
    }
}

/// Failures reported by a completion service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A completion call failed while executing a sequence.
///
/// `step` is 1-based, matching the `sequenceNumber` of step results.
#[derive(Debug, Clone, Error)]
#[error("Error in step {step}: {source}")]
pub struct StepFailure {
    pub step: usize,
    #[source]
    pub source: ProviderError,
}
