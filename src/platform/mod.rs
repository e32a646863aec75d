//! Platform capability traits.
//!
//! The registry does not evaluate predicates itself. It consumes a
//! `PredicateEvaluator` supplied by the host (a browser's `matchMedia`, a
//! windowing toolkit, or the in-process `SimulatedViewport`).
//!
//! Everything here is single-threaded: listeners are `Rc` closures invoked on
//! the host's event-delivery turn and run to completion.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Media query parser used by the simulated viewport.
pub mod query;
/// In-process reference evaluator.
pub mod viewport;

pub use viewport::{MediaType, SimulatedViewport};

/// Callback the platform invokes with the new match value of a subscription.
pub type Listener = Rc<dyn Fn(bool)>;

/// Errors reported by a platform evaluator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The evaluator cannot interpret the predicate.
    #[error("Unsupported query '{query}': {reason}")]
    UnsupportedQuery {
        /// Predicate text as given.
        query: String,
        /// What the evaluator could not handle.
        reason: String,
    },

    /// Backend failure.
    #[error("Evaluator backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },
}

impl PlatformError {
    /// Creates an unsupported-query error.
    #[must_use]
    pub fn unsupported(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Opaque handle to one live platform subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Wraps an evaluator-specific subscription number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The evaluator-specific subscription number.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Evaluates predicates and notifies on changes of their value.
///
/// # Contract
/// - `evaluate` is synchronous and side-effect free.
/// - `subscribe` registers `on_change`; the evaluator calls it with the new
///   value after the value of `predicate` changes. Delivery may happen on a
///   later turn than the change itself.
/// - `unsubscribe` is synchronous: once it returns, the evaluator does not
///   call that listener again. Unknown or already released handles are
///   ignored.
pub trait PredicateEvaluator {
    /// Current match value of `predicate`.
    fn evaluate(&self, predicate: &str) -> Result<bool, PlatformError>;

    /// Start delivering change notifications for `predicate` to `on_change`.
    fn subscribe(&self, predicate: &str, on_change: Listener) -> Result<SubscriptionHandle, PlatformError>;

    /// Stop delivering notifications for `handle`.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// A host environment that may or may not expose a predicate evaluator.
pub trait Host {
    /// The evaluator, if the host has one.
    fn predicate_evaluator(&self) -> Option<Rc<dyn PredicateEvaluator>>;
}

/// A host without any query-matching facility.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn predicate_evaluator(&self) -> Option<Rc<dyn PredicateEvaluator>> {
        None
    }
}
