//! Registry of bindings.
//!
//! The registry is the only object client code touches. It owns its bindings
//! in registration order; membership means "active and receiving
//! notifications". All operations take `&self` so that handlers may call back
//! into a shared registry (for example to deregister themselves).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::binding::{Binding, Handler, Phase};
use crate::error::{BreakpointError, BreakpointResult, ValidationError};
use crate::handlers::HandlerTable;
use crate::platform::{Host, PredicateEvaluator};
use crate::predicate::{json_type_name, BindingHandle, Predicate};

/// Ordered collection of live bindings over one platform evaluator.
pub struct Registry {
    evaluator: Rc<dyn PredicateEvaluator>,
    bindings: RefCell<Vec<Binding>>,
    destroyed: Cell<bool>,
}

impl Registry {
    /// Creates a registry over the host's predicate evaluator.
    ///
    /// # Errors
    /// `CapabilityUnavailable` if the host exposes no evaluator.
    pub fn new(host: &dyn Host) -> BreakpointResult<Self> {
        let evaluator = host.predicate_evaluator().ok_or_else(|| {
            BreakpointError::capability_unavailable("host does not expose a predicate evaluator")
        })?;
        Ok(Self::with_evaluator(evaluator))
    }

    /// Creates a registry over an evaluator the caller already holds.
    #[must_use]
    pub fn with_evaluator(evaluator: Rc<dyn PredicateEvaluator>) -> Self {
        debug!("registry created");
        Self {
            evaluator,
            bindings: RefCell::new(Vec::new()),
            destroyed: Cell::new(false),
        }
    }

    /// Binds `predicate` to `handler`.
    ///
    /// The handler runs once before this returns, with the current match
    /// value, and then once per transition until the binding is deregistered.
    ///
    /// # Errors
    /// - `Validation(EmptyPredicate)` for empty or blank predicate text.
    /// - `CapabilityUnavailable` if the registry has been destroyed.
    /// - `Platform` if the evaluator rejects the predicate.
    pub fn register<F>(&self, predicate: &str, handler: F) -> BreakpointResult<BindingHandle>
    where
        F: FnMut(bool) + 'static,
    {
        let predicate = Predicate::new(predicate)?;
        self.register_predicate(predicate, Box::new(handler))
    }

    /// Binds a dynamically typed predicate to a handler named in `table`.
    ///
    /// The predicate must be a non-empty JSON string and the handler a JSON
    /// string naming an entry of `table`. The predicate is checked first.
    ///
    /// # Errors
    /// - `Validation(PredicateNotText | EmptyPredicate)` for a bad predicate.
    /// - `Validation(HandlerNotCallable | UnknownHandler)` for a bad handler.
    /// - Everything `register` can return.
    pub fn register_value(
        &self,
        predicate: &serde_json::Value,
        handler: &serde_json::Value,
        table: &HandlerTable,
    ) -> BreakpointResult<BindingHandle> {
        let predicate = Predicate::from_value(predicate)?;
        let name = handler.as_str().ok_or_else(|| ValidationError::HandlerNotCallable {
            found: json_type_name(handler).to_string(),
        })?;
        let shared = table.get(name).ok_or_else(|| ValidationError::UnknownHandler {
            name: name.to_string(),
        })?;
        self.register_predicate(predicate, Box::new(move |matches: bool| shared(matches)))
    }

    /// Binds an already validated predicate to a boxed handler.
    pub fn register_predicate(&self, predicate: Predicate, handler: Handler) -> BreakpointResult<BindingHandle> {
        if self.destroyed.get() {
            return Err(BreakpointError::capability_unavailable("registry has been destroyed"));
        }

        let binding = Binding::new(predicate, handler, Rc::clone(&self.evaluator))?;
        let handle = BindingHandle::new(binding.id());

        // The initial report may have re-entered and destroyed the registry.
        if self.destroyed.get() {
            binding.destroy();
            return Err(BreakpointError::capability_unavailable("registry has been destroyed"));
        }

        self.bindings.borrow_mut().push(binding);
        debug!(binding_id = %handle.id(), "registered");
        Ok(handle)
    }

    /// Destroys and removes the binding behind `handle`.
    ///
    /// Unknown handles, including ones already deregistered, are ignored.
    pub fn deregister(&self, handle: BindingHandle) {
        let removed = {
            let mut bindings = self.bindings.borrow_mut();
            bindings
                .iter()
                .position(|b| b.id() == handle.id())
                .map(|idx| bindings.remove(idx))
        };

        if let Some(binding) = removed {
            binding.destroy();
            debug!(binding_id = %handle.id(), "deregistered");
        }
    }

    /// Deregisters every binding in registration order.
    ///
    /// Repeated calls are no-ops. A destroyed registry refuses new
    /// registrations.
    pub fn destroy(&self) {
        let first = !self.destroyed.replace(true);
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        let count = bindings.len();
        for binding in bindings {
            binding.destroy();
        }
        if first {
            debug!(bindings = count, "registry destroyed");
        }
    }

    /// Evaluates `predicate` without creating a binding.
    ///
    /// # Errors
    /// `Validation(EmptyPredicate)` for blank text, `Platform` if the
    /// evaluator fails.
    pub fn matches(&self, predicate: &str) -> BreakpointResult<bool> {
        let predicate = Predicate::new(predicate)?;
        Ok(self.evaluator.evaluate(predicate.as_str())?)
    }

    /// True if `handle` is a live member of this registry.
    #[must_use]
    pub fn contains(&self, handle: BindingHandle) -> bool {
        self.bindings
            .borrow()
            .iter()
            .any(|b| b.id() == handle.id() && b.phase() == Phase::Active)
    }

    /// Current match value of a member binding.
    #[must_use]
    pub fn current(&self, handle: BindingHandle) -> Option<bool> {
        self.bindings
            .borrow()
            .iter()
            .find(|b| b.id() == handle.id())
            .and_then(Binding::matches)
    }

    /// Predicate of a member binding.
    #[must_use]
    pub fn predicate(&self, handle: BindingHandle) -> Option<Predicate> {
        self.bindings
            .borrow()
            .iter()
            .find(|b| b.id() == handle.id())
            .and_then(Binding::predicate)
    }

    /// Handles of all members, in registration order.
    #[must_use]
    pub fn handles(&self) -> Vec<BindingHandle> {
        self.bindings
            .borrow()
            .iter()
            .map(|b| BindingHandle::new(b.id()))
            .collect()
    }

    /// Number of member bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    /// True if there are no member bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// True once `destroy` has been called.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings.borrow())
            .field("destroyed", &self.destroyed.get())
            .finish_non_exhaustive()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::platform::{HeadlessHost, SimulatedViewport};

    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<bool>>>, impl FnMut(bool) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |v: bool| sink.borrow_mut().push(v))
    }

    #[test]
    fn construction_requires_an_evaluator() {
        let err = Registry::new(&HeadlessHost).unwrap_err();
        assert!(err.is_capability_unavailable());

        let vp = SimulatedViewport::shared(800, 600);
        assert!(Registry::new(&vp).is_ok());
    }

    #[test]
    fn register_fires_once_and_becomes_member() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        let (seen, handler) = recorder();

        let handle = registry.register("width<=768", handler).unwrap();

        assert_eq!(*seen.borrow(), vec![true]);
        assert!(registry.contains(handle));
        assert_eq!(registry.current(handle), Some(true));
        assert_eq!(registry.predicate(handle).unwrap().as_str(), "width<=768");
        assert_eq!(registry.handles(), vec![handle]);
    }

    #[test]
    fn register_rejects_blank_predicate() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        let err = registry.register("   ", |_| {}).unwrap_err();
        assert!(err.is_invalid_predicate());
        assert!(registry.is_empty());
        assert_eq!(vp.subscription_count(), 0);
    }

    #[test]
    fn register_value_validates_predicate_then_handler() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        let mut table = HandlerTable::new();
        table.insert("noop", |_| {});

        let err = registry.register_value(&json!(42), &json!("noop"), &table).unwrap_err();
        assert!(err.is_invalid_predicate());

        let err = registry.register_value(&json!(42), &json!(42), &table).unwrap_err();
        assert!(err.is_invalid_predicate());

        let err = registry
            .register_value(&json!("width<=768"), &json!(42), &table)
            .unwrap_err();
        assert!(err.is_invalid_handler());

        let err = registry
            .register_value(&json!("width<=768"), &json!("missing"), &table)
            .unwrap_err();
        assert!(err.is_invalid_handler());

        assert!(registry.is_empty());
        assert!(registry
            .register_value(&json!("width<=768"), &json!("noop"), &table)
            .is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn deregister_twice_is_a_no_op() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        let a = registry.register("(max-width: 768px)", |_| {}).unwrap();
        let b = registry.register("(min-width: 320px)", |_| {}).unwrap();

        registry.deregister(a);
        assert_eq!(registry.handles(), vec![b]);
        registry.deregister(a);
        assert_eq!(registry.handles(), vec![b]);
        assert_eq!(vp.subscription_count(), 1);
    }

    #[test]
    fn deregister_preserves_order() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        let a = registry.register("(min-width: 100px)", |_| {}).unwrap();
        let b = registry.register("(min-width: 200px)", |_| {}).unwrap();
        let c = registry.register("(min-width: 300px)", |_| {}).unwrap();

        registry.deregister(b);
        assert_eq!(registry.handles(), vec![a, c]);
    }

    #[test]
    fn destroy_empties_and_refuses_new_registrations() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        registry.register("(max-width: 768px)", |_| {}).unwrap();
        registry.register("(max-width: 768px)", |_| {}).unwrap();

        registry.destroy();
        registry.destroy();

        assert!(registry.is_empty());
        assert!(registry.is_destroyed());
        assert_eq!(vp.subscription_count(), 0);

        let err = registry.register("(max-width: 768px)", |_| {}).unwrap_err();
        assert!(err.is_capability_unavailable());
    }

    #[test]
    fn matches_is_stateless() {
        let vp = SimulatedViewport::shared(700, 500);
        let registry = Registry::with_evaluator(vp.clone());
        assert!(registry.matches("(max-width: 992px)").unwrap());
        assert!(!registry.matches("(min-width: 992px)").unwrap());
        assert!(registry.matches("").unwrap_err().is_invalid_predicate());
        assert!(registry.matches("(hover)").unwrap_err().is_platform());
        assert!(registry.is_empty());
        assert_eq!(vp.subscription_count(), 0);
    }

    #[test]
    fn dropping_the_registry_releases_subscriptions() {
        let vp = SimulatedViewport::shared(700, 500);
        {
            let registry = Registry::with_evaluator(vp.clone());
            registry.register("(max-width: 768px)", |_| {}).unwrap();
            assert_eq!(vp.subscription_count(), 1);
        }
        assert_eq!(vp.subscription_count(), 0);
    }
}
