//! Sequential step execution.
//!
//! [`run_steps`] is a fold over the step list that threads the memory log
//! forward: step *k* composes its messages from the memory produced by steps
//! `0..k` and nothing else. [`PromptSequencer`] wraps it with the mutable
//! session API (add prompts, set context, clear, execute).

use std::sync::Arc;

use futures::{TryStreamExt, stream};
use promptseq_core::error::{StepFailure, ValidationError};
use promptseq_core::memory::MemoryLog;
use promptseq_core::prompt::{PromptDefaults, PromptSpec, RawPromptSpec, StepStatus};
use promptseq_core::provider::{Provider, ProviderRequest};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::compose::compose;
use crate::session::Session;

/// Outcome of one successfully executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Generated text
    pub content: String,
    pub status: StepStatus,
    /// 1-based position in the sequence
    pub sequence_number: usize,
}

/// State threaded through the fold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    pub memory: MemoryLog,
    pub results: Vec<StepResult>,
}

/// A fold stopped early; carries everything produced before the failure.
#[derive(Debug)]
pub struct Halted {
    pub progress: Progress,
    pub failure: StepFailure,
}

/// Execute `steps` in order, starting from `memory`.
///
/// Stops at the first failing completion call. Step statuses are not
/// touched here; callers read them off `Progress::results`.
pub async fn run_steps(
    provider: &dyn Provider,
    steps: &[PromptSpec],
    global_context: &str,
    memory: MemoryLog,
) -> Result<Progress, Halted> {
    let start = Progress {
        memory,
        results: Vec::with_capacity(steps.len()),
    };

    stream::iter(steps.iter().enumerate().map(Ok::<_, Halted>))
        .try_fold(start, |mut progress, (index, step)| async move {
            let sequence_number = index + 1;
            let messages = compose(step, index, steps, &progress.memory, global_context);

            debug!(
                step = sequence_number,
                model = %step.model,
                messages = messages.len(),
                use_memory = step.use_memory,
                predecessor = step.predecessor,
                "Composed step messages"
            );

            let request = ProviderRequest {
                model: step.model.clone(),
                messages,
                temperature: step.temperature,
                max_tokens: step.max_tokens,
            };

            let response = match provider.complete(request).await {
                Ok(response) => response,
                Err(source) => {
                    error!(step = sequence_number, error = %source, "Step failed");
                    return Err(Halted {
                        progress,
                        failure: StepFailure {
                            step: sequence_number,
                            source,
                        },
                    });
                }
            };

            let status = if response.finish_reason.is_normal() {
                StepStatus::Complete
            } else {
                warn!(
                    step = sequence_number,
                    finish_reason = ?response.finish_reason,
                    "Step stopped abnormally"
                );
                StepStatus::Incomplete
            };

            progress
                .memory
                .record_exchange(step.role, step.content.clone(), response.content.clone());
            progress.results.push(StepResult {
                content: response.content,
                status,
                sequence_number,
            });

            Ok(progress)
        })
        .await
}

/// Drives a [`Session`] against a completion provider.
///
/// Not meant to be shared between concurrent executions; build one per
/// execution (see [`execute_request`](crate::execute_request)).
pub struct PromptSequencer {
    provider: Arc<dyn Provider>,
    defaults: PromptDefaults,
    session: Session,
}

impl PromptSequencer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::from_session(provider, Session::new())
    }

    /// Resume from an existing session value.
    pub fn from_session(provider: Arc<dyn Provider>, session: Session) -> Self {
        Self {
            provider,
            defaults: PromptDefaults::default(),
            session,
        }
    }

    /// Use `defaults` for prompts added from now on.
    pub fn with_defaults(mut self, defaults: PromptDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn set_global_context(&mut self, text: impl Into<String>) {
        self.session.set_global_context(text);
    }

    /// Normalize `raw` and append it. On error the sequence is unchanged.
    pub fn add_prompt(&mut self, raw: RawPromptSpec) -> Result<(), ValidationError> {
        let spec = raw.normalize_with(&self.defaults)?;
        self.session.push_step(spec);
        Ok(())
    }

    pub fn steps(&self) -> &[PromptSpec] {
        self.session.steps()
    }

    pub fn memory_log(&self) -> &MemoryLog {
        self.session.memory_log()
    }

    pub fn clear_memory(&mut self) {
        self.session.clear_memory();
    }

    pub fn clear_sequences(&mut self) {
        self.session.clear_sequences();
    }

    /// Run every queued step in order.
    ///
    /// On failure the memory log keeps the entries of the steps that did
    /// run, steps from the failing one onward stay `pending`, and only the
    /// failure is returned.
    pub async fn execute(&mut self) -> Result<Vec<StepResult>, StepFailure> {
        let run_id = uuid::Uuid::new_v4();
        let span = info_span!("execute", %run_id, steps = self.session.steps.len());

        for step in &mut self.session.steps {
            step.status = StepStatus::Pending;
        }

        // Session memory is only replaced once the fold returns.
        let outcome = run_steps(
            &*self.provider,
            &self.session.steps,
            &self.session.global_context,
            self.session.memory.clone(),
        )
        .instrument(span.clone())
        .await;

        let (progress, failure) = match outcome {
            Ok(progress) => (progress, None),
            Err(halted) => (halted.progress, Some(halted.failure)),
        };

        for (step, result) in self.session.steps.iter_mut().zip(&progress.results) {
            step.status = result.status;
        }
        self.session.memory = progress.memory;

        match failure {
            Some(failure) => Err(failure),
            None => {
                info!(
                    parent: &span,
                    completed = progress.results.len(),
                    memory_entries = self.session.memory.len(),
                    "Sequence executed"
                );
                Ok(progress.results)
            }
        }
    }
}
