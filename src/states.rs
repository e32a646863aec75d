//! Named breakpoint states.
//!
//! A `StateSet` gives each binding a name (`"mobile"`, `"desktop"`) and keeps
//! track of which states are currently active, in the order they became
//! active. Each state's bookkeeping is captured by its own handler at
//! registration; the set holds no cross-state mutable context beyond the
//! active list those handlers write to.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::error::{BreakpointResult, ValidationError};
use crate::handlers::MatchHandlers;
use crate::platform::Host;
use crate::predicate::{BindingHandle, Predicate};
use crate::registry::Registry;

#[derive(Debug)]
struct StateEntry {
    name: String,
    handle: BindingHandle,
}

/// Named states over one registry.
#[derive(Debug)]
pub struct StateSet {
    registry: Registry,
    states: RefCell<Vec<StateEntry>>,
    active: Rc<RefCell<Vec<String>>>,
}

impl StateSet {
    /// Creates a state set over the host's predicate evaluator.
    ///
    /// # Errors
    /// `CapabilityUnavailable` if the host exposes no evaluator.
    pub fn new(host: &dyn Host) -> BreakpointResult<Self> {
        Ok(Self::from_registry(Registry::new(host)?))
    }

    /// Wraps an existing registry.
    ///
    /// Bindings already registered on it are not tracked as states.
    #[must_use]
    pub fn from_registry(registry: Registry) -> Self {
        Self {
            registry,
            states: RefCell::new(Vec::new()),
            active: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Defines a named state. Names are trimmed here and in every lookup.
    ///
    /// `handlers` run according to `MatchHandlers` semantics; the state is
    /// marked active before its match callbacks run and inactive before its
    /// unmatch callbacks run.
    ///
    /// # Errors
    /// - `Validation(EmptyStateName | DuplicateState)` for a bad name.
    /// - Everything `Registry::register` can return.
    pub fn add_state(&self, name: &str, query: &str, handlers: MatchHandlers) -> BreakpointResult<BindingHandle> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyStateName.into());
        }
        if self.contains(name) {
            return Err(ValidationError::DuplicateState {
                name: name.to_string(),
            }
            .into());
        }
        let predicate = Predicate::new(query)?;

        let active = Rc::clone(&self.active);
        let state_name = name.to_string();
        let mut inner = handlers.into_handler();
        let handler = move |matches: bool| {
            {
                let mut active = active.borrow_mut();
                let present = active.iter().any(|n| n == &state_name);
                if matches && !present {
                    active.push(state_name.clone());
                } else if !matches && present {
                    active.retain(|n| n != &state_name);
                }
            }
            inner(matches);
        };

        let handle = self.registry.register_predicate(predicate, Box::new(handler))?;
        self.states.borrow_mut().push(StateEntry {
            name: name.to_string(),
            handle,
        });
        debug!(state = name, binding_id = %handle.id(), "state added");
        Ok(handle)
    }

    /// Removes a named state. Returns false if no such state exists.
    ///
    /// The state leaves the active list without running unmatch callbacks.
    pub fn remove_state(&self, name: &str) -> bool {
        let name = name.trim();
        let removed = {
            let mut states = self.states.borrow_mut();
            states
                .iter()
                .position(|s| s.name == name)
                .map(|idx| states.remove(idx))
        };
        let Some(entry) = removed else {
            return false;
        };

        self.registry.deregister(entry.handle);
        self.active.borrow_mut().retain(|n| n != name);
        debug!(state = name, "state removed");
        true
    }

    /// True if the named state is currently active.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        let name = name.trim();
        self.active.borrow().iter().any(|n| n == name)
    }

    /// Active state names in activation order.
    #[must_use]
    pub fn active_states(&self) -> Vec<String> {
        self.active.borrow().clone()
    }

    /// Defined state names in definition order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.states.borrow().iter().map(|s| s.name.clone()).collect()
    }

    /// True if a state with this name is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let name = name.trim();
        self.states.borrow().iter().any(|s| s.name == name)
    }

    /// Binding handle of a named state.
    #[must_use]
    pub fn handle(&self, name: &str) -> Option<BindingHandle> {
        let name = name.trim();
        self.states.borrow().iter().find(|s| s.name == name).map(|s| s.handle)
    }

    /// Evaluates `query` without defining a state.
    ///
    /// # Errors
    /// See `Registry::matches`.
    pub fn matches(&self, query: &str) -> BreakpointResult<bool> {
        self.registry.matches(query)
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Removes every state and destroys the registry.
    pub fn destroy(&self) {
        self.registry.destroy();
        self.states.borrow_mut().clear();
        self.active.borrow_mut().clear();
    }
}
