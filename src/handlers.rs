//! Handler helpers built on the single `FnMut(bool)` contract.
//!
//! - `HandlerTable` names shared handlers so that state definitions loaded
//!   from configuration can refer to them.
//! - `MatchHandlers` adapts separate match/unmatch callbacks into one handler.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Shared handler that can be referenced by name.
pub type SharedHandler = Rc<dyn Fn(bool)>;

/// Name → handler lookup for dynamically defined bindings.
#[derive(Default, Clone)]
pub struct HandlerTable {
    handlers: BTreeMap<String, SharedHandler>,
}

impl HandlerTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a handler under `name`.
    pub fn insert<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(bool) + 'static,
    {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }

    /// Looks up a handler by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedHandler> {
        self.handlers.get(name).cloned()
    }

    /// True if `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

type Callback = Box<dyn FnMut()>;

/// Match/unmatch adapter.
///
/// Produces a single handler that runs every `on_match` callback whenever it
/// receives `true`, and every `on_unmatch` callback when it receives `false`
/// after having received `true`. An initial `false` runs nothing, since the
/// state was never entered.
#[derive(Default)]
pub struct MatchHandlers {
    on_match: Vec<Callback>,
    on_unmatch: Vec<Callback>,
}

impl MatchHandlers {
    /// Creates an adapter with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback run when the predicate starts matching.
    #[must_use]
    pub fn on_match<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_match.push(Box::new(callback));
        self
    }

    /// Adds a callback run when the predicate stops matching.
    #[must_use]
    pub fn on_unmatch<F>(mut self, callback: F) -> Self
    where
        F: FnMut() + 'static,
    {
        self.on_unmatch.push(Box::new(callback));
        self
    }

    /// Number of match and unmatch callbacks.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (self.on_match.len(), self.on_unmatch.len())
    }

    /// Collapses the adapter into a single handler.
    pub fn into_handler(self) -> impl FnMut(bool) + 'static {
        let Self {
            mut on_match,
            mut on_unmatch,
        } = self;
        let mut entered = false;

        move |matches: bool| {
            if matches {
                entered = true;
                for cb in &mut on_match {
                    cb();
                }
            } else if entered {
                entered = false;
                for cb in &mut on_unmatch {
                    cb();
                }
            }
        }
    }
}

impl fmt::Debug for MatchHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchHandlers")
            .field("on_match", &self.on_match.len())
            .field("on_unmatch", &self.on_unmatch.len())
            .finish()
    }
}
