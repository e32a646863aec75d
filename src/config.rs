//! State definitions loaded from JSON.
//!
//! ```json
//! {
//!   "states": [
//!     { "name": "mobile",  "query": "(max-width: 767px)", "on_match": "showMenu", "on_unmatch": ["hideMenu"] },
//!     { "name": "desktop", "query": "(min-width: 992px)" }
//!   ]
//! }
//! ```
//!
//! `query` and the handler references are kept as raw JSON values so that a
//! wrong type is reported as an invalid predicate or invalid handler rather
//! than as a parse failure of the whole document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BreakpointError, BreakpointResult, ValidationError};
use crate::handlers::{HandlerTable, MatchHandlers};
use crate::predicate::{json_type_name, BindingHandle, Predicate};
use crate::states::StateSet;

/// One named state definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDef {
    /// Unique state name.
    pub name: String,
    /// Predicate text; must be a non-empty string.
    pub query: Value,
    /// Handler name(s) run on entering the state.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub on_match: Value,
    /// Handler name(s) run on leaving the state.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub on_unmatch: Value,
}

/// A document of state definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatesConfig {
    /// Definitions in registration order.
    #[serde(default)]
    pub states: Vec<StateDef>,
}

impl StatesConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    /// `Config` if the document is not valid JSON of the expected shape.
    pub fn from_json_str(json: &str) -> BreakpointResult<Self> {
        serde_json::from_str(json).map_err(|e| BreakpointError::config(format!("invalid states document: {e}")))
    }

    /// Reads and parses a JSON file.
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> BreakpointResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| BreakpointError::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// Every handler name referenced by the definitions, sorted, without
    /// duplicates. Malformed references are skipped.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .states
            .iter()
            .flat_map(|def| [&def.on_match, &def.on_unmatch])
            .flat_map(|refs| match refs {
                Value::String(s) => vec![s.clone()],
                Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
                _ => Vec::new(),
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Defines every state on `set`, resolving handler names in `table`.
    ///
    /// Definitions are applied in order and stop at the first error; states
    /// defined before the failing one stay defined.
    ///
    /// # Errors
    /// - `Validation(PredicateNotText | EmptyPredicate)` for a bad `query`.
    /// - `Validation(HandlerNotCallable | UnknownHandler)` for a bad handler
    ///   reference.
    /// - Everything `StateSet::add_state` can return.
    pub fn apply(&self, set: &StateSet, table: &HandlerTable) -> BreakpointResult<Vec<(String, BindingHandle)>> {
        let mut defined = Vec::with_capacity(self.states.len());
        for def in &self.states {
            let predicate = Predicate::from_value(&def.query)?;
            let mut handlers = MatchHandlers::new();
            for handler in resolve_refs(&def.on_match, table)? {
                handlers = handlers.on_match(move || handler(true));
            }
            for handler in resolve_refs(&def.on_unmatch, table)? {
                handlers = handlers.on_unmatch(move || handler(false));
            }
            let handle = set.add_state(&def.name, predicate.as_str(), handlers)?;
            defined.push((def.name.clone(), handle));
        }
        Ok(defined)
    }
}

/// Resolves `null`, a name, or an array of names against `table`.
fn resolve_refs(refs: &Value, table: &HandlerTable) -> Result<Vec<crate::handlers::SharedHandler>, ValidationError> {
    let lookup = |name: &str| {
        table.get(name).ok_or_else(|| ValidationError::UnknownHandler {
            name: name.to_string(),
        })
    };

    match refs {
        Value::Null => Ok(Vec::new()),
        Value::String(name) => Ok(vec![lookup(name)?]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => lookup(name),
                other => Err(ValidationError::HandlerNotCallable {
                    found: json_type_name(other).to_string(),
                }),
            })
            .collect(),
        other => Err(ValidationError::HandlerNotCallable {
            found: json_type_name(other).to_string(),
        }),
    }
}
