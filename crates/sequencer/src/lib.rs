//! Prompt sequencing engine.
//!
//! Runs an ordered list of prompts against a completion [`Provider`], one at a
//! time, building each step's messages from the global context, the memory
//! accumulated by earlier steps, and optionally the previous prompt.
//!
//! ```text
//! RawPromptSpec ──normalize──▶ PromptSpec ──┐
//!                                           ▼
//!            global context + memory ──▶ compose ──▶ Provider::complete
//!                    ▲                                      │
//!                    └────────── record_exchange ◀──────────┘
//! ```
//!
//! [`Provider`]: promptseq_core::Provider

pub mod compose;
pub mod csv;
pub mod executor;
pub mod request;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use compose::compose;
pub use executor::{Halted, Progress, PromptSequencer, StepResult, run_steps};
pub use request::{ExecuteRequest, ExecuteResponse, execute_request};
pub use session::Session;
