//! One-shot execution of a whole request payload.

use std::sync::Arc;

use promptseq_core::error::{Error, ValidationError};
use promptseq_core::memory::MemoryEntry;
use promptseq_core::prompt::{PromptDefaults, PromptOverrides, RawPromptSpec};
use promptseq_core::provider::Provider;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::executor::{PromptSequencer, StepResult};

/// Prompts plus an optional global context, as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub prompts: Vec<RawPromptSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_context: Option<String>,
}

impl ExecuteRequest {
    pub fn new(prompts: Vec<RawPromptSpec>) -> Self {
        Self {
            prompts,
            global_context: None,
        }
    }

    pub fn with_global_context(mut self, text: impl Into<String>) -> Self {
        self.global_context = Some(text.into());
        self
    }

    /// Parse an untyped payload.
    ///
    /// A missing or non-array `prompts` is rejected before looking at any
    /// individual prompt. A prompt that does not deserialize is reported by
    /// its 1-based position.
    pub fn from_value(mut value: Value) -> Result<Self, Error> {
        let Some(Value::Array(prompts)) = value.get_mut("prompts").map(Value::take) else {
            return Err(ValidationError::InvalidShape("Invalid prompts data".into()).into());
        };

        let prompts = prompts
            .into_iter()
            .enumerate()
            .map(|(i, prompt)| {
                serde_json::from_value(prompt)
                    .map_err(|e| ValidationError::InvalidShape(e.to_string()).at_prompt(i + 1))
            })
            .collect::<Result<Vec<RawPromptSpec>, _>>()?;

        let global_context = value
            .get_mut("globalContext")
            .map(Value::take)
            .unwrap_or(Value::Null);

        Ok(Self {
            prompts,
            global_context: serde_json::from_value(global_context)?,
        })
    }

    /// Apply `overrides` to every prompt.
    pub fn apply_overrides(&mut self, overrides: &PromptOverrides) {
        if overrides.is_empty() {
            return;
        }
        for prompt in &mut self.prompts {
            overrides.apply(prompt);
        }
    }
}

/// Everything an execution produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub results: Vec<StepResult>,
    pub memory_log: Vec<MemoryEntry>,
}

/// Normalize, queue and execute every prompt of `request` on a fresh
/// sequencer.
///
/// Validation runs over the whole batch first, so an invalid prompt means
/// no completion call is made at all.
pub async fn execute_request(
    provider: Arc<dyn Provider>,
    request: ExecuteRequest,
    defaults: &PromptDefaults,
) -> Result<ExecuteResponse, Error> {
    let mut sequencer = PromptSequencer::new(provider).with_defaults(defaults.clone());

    if let Some(context) = request.global_context.filter(|c| !c.is_empty()) {
        sequencer.set_global_context(context);
    }

    for (i, raw) in request.prompts.into_iter().enumerate() {
        sequencer.add_prompt(raw).map_err(|e| e.at_prompt(i + 1))?;
    }
    debug!(prompts = sequencer.steps().len(), "Request normalized");

    let results = sequencer.execute().await?;
    let memory_log = sequencer.into_session().memory.into_entries();

    Ok(ExecuteResponse {
        results,
        memory_log,
    })
}
