//! Error types for the breakpoint registry.
//!
//! All errors are strongly typed using thiserror and surfaced synchronously
//! to the direct caller. Nothing in this crate retries or swallows them.

use thiserror::Error;

use crate::platform::PlatformError;

/// Validation errors raised while checking registration arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Predicate cannot be empty")]
    EmptyPredicate,

    #[error("Predicate must be a text value, got {found}")]
    PredicateNotText {
        found: String,
    },

    #[error("Handler is not callable: {found}")]
    HandlerNotCallable {
        found: String,
    },

    #[error("Handler '{name}' is not registered")]
    UnknownHandler {
        name: String,
    },

    #[error("State name cannot be empty")]
    EmptyStateName,

    #[error("State '{name}' is already defined")]
    DuplicateState {
        name: String,
    },
}

impl ValidationError {
    /// Returns true if the predicate argument was rejected.
    #[must_use]
    pub const fn is_predicate(&self) -> bool {
        matches!(self, Self::EmptyPredicate | Self::PredicateNotText { .. })
    }

    /// Returns true if the handler argument was rejected.
    #[must_use]
    pub const fn is_handler(&self) -> bool {
        matches!(self, Self::HandlerNotCallable { .. } | Self::UnknownHandler { .. })
    }
}

/// Top-level error type for the breakpoint registry.
#[derive(Debug, Error)]
pub enum BreakpointError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Capability unavailable: {reason}")]
    CapabilityUnavailable {
        reason: String,
    },

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Configuration error: {message}")]
    Config {
        message: String,
    },
}

impl BreakpointError {
    /// Creates a capability error.
    #[must_use]
    pub fn capability_unavailable(reason: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the predicate argument was not a non-empty text value.
    #[must_use]
    pub const fn is_invalid_predicate(&self) -> bool {
        match self {
            Self::Validation(e) => e.is_predicate(),
            _ => false,
        }
    }

    /// Returns true if the handler argument could not be resolved to a callable.
    #[must_use]
    pub const fn is_invalid_handler(&self) -> bool {
        match self {
            Self::Validation(e) => e.is_handler(),
            _ => false,
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if the host capability is missing or the registry is gone.
    #[must_use]
    pub const fn is_capability_unavailable(&self) -> bool {
        matches!(self, Self::CapabilityUnavailable { .. })
    }

    /// Returns true if the platform evaluator itself failed.
    #[must_use]
    pub const fn is_platform(&self) -> bool {
        matches!(self, Self::Platform(_))
    }

    /// Returns true if a state definition file could not be loaded.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

/// Result type alias for breakpoint operations.
pub type BreakpointResult<T> = Result<T, BreakpointError>;
