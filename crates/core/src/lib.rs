//! # promptseq Core
//!
//! Domain types, traits, and error definitions for the promptseq prompt
//! sequencer. This crate has **no runtime dependencies** beyond serde and
//! thiserror; it defines the domain model every other crate builds on.
//!
//! ## Layout
//!
//! - [`message`]: the closed [`Role`] set and the `{role, content}` [`Message`]
//! - [`memory`]: the append-only [`MemoryLog`] replayed into later steps
//! - [`prompt`]: raw prompt input, normalization, and the canonical [`PromptSpec`]
//! - [`provider`]: the [`Provider`] trait over completion services
//! - [`error`]: the error taxonomy shared by all crates

pub mod error;
pub mod memory;
pub mod message;
pub mod prompt;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StepFailure, ValidationError};
pub use memory::{MemoryEntry, MemoryLog};
pub use message::{Message, Role};
pub use prompt::{PromptDefaults, PromptOverrides, PromptSpec, RawPromptSpec, Scalar, StepStatus};
pub use provider::{FinishReason, Provider, ProviderRequest, ProviderResponse, Usage};
