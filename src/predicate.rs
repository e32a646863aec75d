//! Predicate text and binding identifiers.
//!
//! A predicate is opaque to this crate: it is validated only for being
//! non-empty text and is otherwise handed to the platform evaluator as is.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A validated, non-empty predicate string such as `(max-width: 768px)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Predicate(String);

impl Predicate {
    /// Validates and wraps predicate text.
    ///
    /// Leading and trailing whitespace is trimmed; text that is empty after
    /// trimming is rejected.
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPredicate);
        }
        if trimmed.len() == text.len() {
            Ok(Self(text))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Validates a dynamically typed predicate, as found in state definitions.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ValidationError> {
        match value {
            serde_json::Value::String(s) => Self::new(s.as_str()),
            other => Err(ValidationError::PredicateNotText {
                found: json_type_name(other).to_string(),
            }),
        }
    }

    /// The predicate text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Predicate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::new(text).map_err(serde::de::Error::custom)
    }
}

/// Human-readable JSON type name used in validation messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(Uuid);

impl BindingId {
    /// Creates a new random binding id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle returned by `Registry::register`.
///
/// Handles stay valid as values after deregistration; using one with a
/// registry that no longer holds the binding is a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingHandle {
    id: BindingId,
}

impl BindingHandle {
    pub(crate) const fn new(id: BindingId) -> Self {
        Self { id }
    }

    /// The id of the binding behind this handle.
    #[must_use]
    pub const fn id(&self) -> BindingId {
        self.id
    }
}
