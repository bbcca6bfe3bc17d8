//! Prompt definitions: loosely typed input and the canonical record.
//!
//! Callers hand in a [`RawPromptSpec`] whose numeric and boolean fields may
//! arrive as native JSON values or as their text forms (CSV import, HTML
//! forms). [`RawPromptSpec::normalize`] validates and coerces it into a
//! [`PromptSpec`], the only shape the sequencer works with.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::message::Role;

/// Model used when a prompt does not name one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Sampling temperature used when a prompt does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 1.0;

/// Lifecycle of one step within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    /// The service stopped normally.
    Complete,
    /// The service stopped for any other reason (e.g. length truncation).
    Incomplete,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StepStatus::Pending => "pending",
            StepStatus::Complete => "complete",
            StepStatus::Incomplete => "incomplete",
        })
    }
}

/// A JSON scalar as it arrives from the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// A prompt definition before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPromptSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_memory: Option<Scalar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessor: Option<Scalar>,
}

/// Fallbacks applied for absent model and temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptDefaults {
    pub model: String,
    pub temperature: f32,
}

impl Default for PromptDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// One canonical step of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSpec {
    pub role: Role,
    pub content: String,
    pub model: String,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub use_memory: bool,
    pub predecessor: bool,
    #[serde(default)]
    pub status: StepStatus,
}

impl PromptSpec {
    /// A pending user prompt with default model and temperature.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            use_memory: false,
            predecessor: false,
            status: StepStatus::Pending,
        }
    }
}

impl RawPromptSpec {
    /// A raw prompt carrying only content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Normalize against the built-in defaults.
    pub fn normalize(self) -> Result<PromptSpec, ValidationError> {
        self.normalize_with(&PromptDefaults::default())
    }

    /// Validate and coerce into a canonical [`PromptSpec`].
    ///
    /// The result is always `pending`, whatever the input carried.
    pub fn normalize_with(self, defaults: &PromptDefaults) -> Result<PromptSpec, ValidationError> {
        let role = match self.role.as_deref() {
            None | Some("") => Role::User,
            Some(name) => name.parse()?,
        };

        let content = self.content.ok_or(ValidationError::MissingContent)?;

        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| defaults.model.clone());

        let temperature = match self.temperature {
            Some(value) => coerce_temperature(value)?.unwrap_or(defaults.temperature),
            None => defaults.temperature,
        };

        let max_tokens = match self.max_tokens {
            Some(value) => coerce_max_tokens(value)?,
            None => None,
        };

        Ok(PromptSpec {
            role,
            content,
            model,
            temperature,
            max_tokens,
            use_memory: coerce_flag("useMemory", self.use_memory)?,
            predecessor: coerce_flag("predecessor", self.predecessor)?,
            status: StepStatus::Pending,
        })
    }
}

impl From<&PromptSpec> for RawPromptSpec {
    fn from(spec: &PromptSpec) -> Self {
        Self {
            role: Some(spec.role.as_str().into()),
            content: Some(spec.content.clone()),
            model: Some(spec.model.clone()),
            temperature: Some(Scalar::Number(f64::from(spec.temperature))),
            max_tokens: spec.max_tokens.map(|n| Scalar::Number(f64::from(n))),
            use_memory: Some(Scalar::Bool(spec.use_memory)),
            predecessor: Some(Scalar::Bool(spec.predecessor)),
        }
    }
}

/// `None` means "use the default".
fn coerce_temperature(value: Scalar) -> Result<Option<f32>, ValidationError> {
    let invalid = |v: &Scalar| ValidationError::InvalidNumber {
        field: "temperature",
        value: v.to_string(),
    };

    let number = match &value {
        Scalar::Number(n) => *n,
        Scalar::Text(s) if s.trim().is_empty() => return Ok(None),
        Scalar::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid(&value))?,
        Scalar::Bool(_) => return Err(invalid(&value)),
    };

    if !number.is_finite() {
        return Err(invalid(&value));
    }
    Ok(Some(number as f32))
}

/// Falsy inputs (`0`, `""`, `false`) leave the limit unset.
fn coerce_max_tokens(value: Scalar) -> Result<Option<u32>, ValidationError> {
    let invalid = |v: &Scalar| ValidationError::InvalidNumber {
        field: "maxTokens",
        value: v.to_string(),
    };

    let number = match &value {
        Scalar::Number(n) => *n,
        Scalar::Text(s) if s.trim().is_empty() => return Ok(None),
        Scalar::Text(s) => s.trim().parse::<f64>().map_err(|_| invalid(&value))?,
        Scalar::Bool(false) => return Ok(None),
        Scalar::Bool(true) => return Err(invalid(&value)),
    };

    if number == 0.0 {
        return Ok(None);
    }
    if !number.is_finite() || number < 0.0 || number.fract() != 0.0 || number > f64::from(u32::MAX)
    {
        return Err(invalid(&value));
    }
    Ok(Some(number as u32))
}

fn coerce_flag(field: &'static str, value: Option<Scalar>) -> Result<bool, ValidationError> {
    match value {
        None => Ok(false),
        Some(Scalar::Bool(b)) => Ok(b),
        Some(Scalar::Number(n)) => Ok(n != 0.0),
        Some(Scalar::Text(s)) => {
            let s = s.trim();
            if s.eq_ignore_ascii_case("true") {
                Ok(true)
            } else if s.is_empty() || s.eq_ignore_ascii_case("false") {
                Ok(false)
            } else {
                Err(ValidationError::InvalidFlag {
                    field,
                    value: s.to_string(),
                })
            }
        }
    }
}

/// Values applied to every prompt of a batch before normalization.
///
/// Unset fields leave the prompt's own value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptOverrides {
    pub role: Option<Role>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub use_memory: Option<bool>,
    pub predecessor: Option<bool>,
}

impl PromptOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, raw: &mut RawPromptSpec) {
        if let Some(role) = self.role {
            raw.role = Some(role.as_str().into());
        }
        if let Some(model) = self.model.as_ref().filter(|m| !m.is_empty()) {
            raw.model = Some(model.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            raw.max_tokens = Some(Scalar::Number(f64::from(max_tokens)));
        }
        if let Some(temperature) = self.temperature {
            raw.temperature = Some(Scalar::Number(f64::from(temperature)));
        }
        if let Some(use_memory) = self.use_memory {
            raw.use_memory = Some(Scalar::Bool(use_memory));
        }
        if let Some(predecessor) = self.predecessor {
            raw.predecessor = Some(Scalar::Bool(predecessor));
        }
    }
}
