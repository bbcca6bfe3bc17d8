//! Session state as a plain value.
//!
//! A [`Session`] holds everything one execution needs besides the provider:
//! the global context, the ordered steps, and the memory log. Handing it in
//! and out of a [`PromptSequencer`](crate::PromptSequencer) keeps executions
//! isolated from each other.

use promptseq_core::memory::MemoryLog;
use promptseq_core::prompt::PromptSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub(crate) global_context: String,
    pub(crate) steps: Vec<PromptSpec>,
    pub(crate) memory: MemoryLog,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global context used by subsequent executions.
    pub fn set_global_context(&mut self, text: impl Into<String>) {
        self.global_context = text.into();
    }

    pub fn global_context(&self) -> &str {
        &self.global_context
    }

    /// Append an already-normalized step.
    pub fn push_step(&mut self, step: PromptSpec) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PromptSpec] {
        &self.steps
    }

    pub fn memory_log(&self) -> &MemoryLog {
        &self.memory
    }

    /// Empty the memory log; steps and context are kept.
    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    /// Empty the step list; memory and context are kept.
    pub fn clear_sequences(&mut self) {
        self.steps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptseq_core::message::Role;

    fn populated() -> Session {
        let mut session = Session::new();
        session.set_global_context("ctx");
        session.push_step(PromptSpec::user("a"));
        session.memory.record_exchange(Role::User, "a", "A");
        session
    }

    #[test]
    fn clear_memory_keeps_steps_and_context() {
        let mut session = populated();
        session.clear_memory();
        assert!(session.memory_log().is_empty());
        assert_eq!(session.steps().len(), 1);
        assert_eq!(session.global_context(), "ctx");
    }

    #[test]
    fn clear_sequences_keeps_memory_and_context() {
        let mut session = populated();
        session.clear_sequences();
        assert!(session.steps().is_empty());
        assert_eq!(session.memory_log().len(), 2);
        assert_eq!(session.global_context(), "ctx");
    }

    #[test]
    fn global_context_is_replaced() {
        let mut session = populated();
        session.set_global_context("");
        assert_eq!(session.global_context(), "");
    }
}
