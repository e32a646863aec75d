//! Binding: one predicate, one handler, one platform subscription.
//!
//! A binding fires its handler once on construction with the current match
//! value and then once per genuine transition. After `destroy` the handler is
//! gone and stray notifications are ignored.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::error::BreakpointResult;
use crate::platform::{Listener, PredicateEvaluator, SubscriptionHandle};
use crate::predicate::{BindingId, Predicate};

/// Boxed single-callback handler: receives the current match value.
pub type Handler = Box<dyn FnMut(bool)>;

/// Lifecycle phase of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Subscribed, initial value not yet reported.
    Pending,
    /// Receiving notifications.
    Active,
    /// Torn down; terminal.
    Destroyed,
}

struct BindingInner {
    id: BindingId,
    predicate: RefCell<Option<Predicate>>,
    matches: Cell<bool>,
    phase: Cell<Phase>,
    handler: RefCell<Option<Handler>>,
    subscription: Cell<Option<SubscriptionHandle>>,
    evaluator: Rc<dyn PredicateEvaluator>,
    dispatching: Cell<bool>,
    last_reported: Cell<Option<bool>>,
}

impl BindingInner {
    fn on_change(&self, value: bool) {
        if self.phase.get() != Phase::Active {
            trace!(binding_id = %self.id, value, "ignoring notification for inactive binding");
            return;
        }
        if value == self.matches.get() {
            trace!(binding_id = %self.id, value, "ignoring duplicate notification");
            return;
        }
        trace!(binding_id = %self.id, value, "transition");
        self.matches.set(value);
        self.dispatch();
    }

    /// Run the handler until it has seen the latest value.
    ///
    /// The handler is taken out of its slot for the duration of the call, so
    /// a handler that re-enters the registry never observes a held borrow.
    /// Notifications delivered during the call are folded: at most one
    /// follow-up call is made, and only if they leave `matches` different
    /// from what was last reported. A pair that flips away and back while the
    /// handler runs is therefore never seen by it.
    fn dispatch(&self) {
        if self.dispatching.replace(true) {
            return;
        }

        let mut guard = DispatchGuard {
            inner: self,
            handler: None,
        };
        loop {
            if self.phase.get() == Phase::Destroyed {
                break;
            }
            let value = self.matches.get();
            if self.last_reported.get() == Some(value) {
                break;
            }
            if guard.handler.is_none() {
                guard.handler = self.handler.borrow_mut().take();
            }
            let Some(handler) = guard.handler.as_mut() else {
                break;
            };

            self.last_reported.set(Some(value));
            handler(value);
        }
    }

    fn destroy(&self) -> bool {
        if self.phase.replace(Phase::Destroyed) == Phase::Destroyed {
            return false;
        }
        if let Some(handle) = self.subscription.take() {
            self.evaluator.unsubscribe(handle);
        }
        self.handler.borrow_mut().take();
        self.predicate.borrow_mut().take();
        self.matches.set(false);
        self.last_reported.set(None);
        true
    }
}

/// Holds the handler while it runs and puts it back on exit, unwinding
/// included, unless the binding was destroyed meanwhile.
struct DispatchGuard<'a> {
    inner: &'a BindingInner,
    handler: Option<Handler>,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            if self.inner.phase.get() != Phase::Destroyed {
                *self.inner.handler.borrow_mut() = Some(handler);
            }
        }
        self.inner.dispatching.set(false);
    }
}

/// Live association between a predicate, a handler, and a subscription.
///
/// Bindings are created and destroyed only by `Registry`.
pub(crate) struct Binding {
    inner: Rc<BindingInner>,
}

impl Binding {
    /// Subscribe, read the current value, and report it to `handler`.
    ///
    /// Platform failures propagate. If evaluation fails after subscribing, the
    /// subscription is released before returning.
    pub(crate) fn new(
        predicate: Predicate,
        handler: Handler,
        evaluator: Rc<dyn PredicateEvaluator>,
    ) -> BreakpointResult<Self> {
        let inner = Rc::new(BindingInner {
            id: BindingId::new(),
            predicate: RefCell::new(Some(predicate.clone())),
            matches: Cell::new(false),
            phase: Cell::new(Phase::Pending),
            handler: RefCell::new(Some(handler)),
            subscription: Cell::new(None),
            evaluator: Rc::clone(&evaluator),
            dispatching: Cell::new(false),
            last_reported: Cell::new(None),
        });

        let weak: Weak<BindingInner> = Rc::downgrade(&inner);
        let listener: Listener = Rc::new(move |value: bool| {
            if let Some(inner) = weak.upgrade() {
                inner.on_change(value);
            }
        });

        let handle = evaluator.subscribe(predicate.as_str(), listener)?;
        inner.subscription.set(Some(handle));

        let matches = match evaluator.evaluate(predicate.as_str()) {
            Ok(v) => v,
            Err(e) => {
                inner.destroy();
                return Err(e.into());
            }
        };

        inner.matches.set(matches);
        inner.phase.set(Phase::Active);
        debug!(binding_id = %inner.id, predicate = %predicate, matches, "binding active");
        inner.dispatch();

        Ok(Self { inner })
    }

    pub(crate) fn id(&self) -> BindingId {
        self.inner.id
    }

    pub(crate) fn predicate(&self) -> Option<Predicate> {
        self.inner.predicate.borrow().clone()
    }

    /// Current match value, or `None` once destroyed.
    pub(crate) fn matches(&self) -> Option<bool> {
        match self.inner.phase.get() {
            Phase::Destroyed => None,
            _ => Some(self.inner.matches.get()),
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// Release the subscription and drop the handler. Idempotent.
    pub(crate) fn destroy(&self) {
        if self.inner.destroy() {
            debug!(binding_id = %self.inner.id, "binding destroyed");
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("predicate", &self.inner.predicate.borrow())
            .field("matches", &self.inner.matches.get())
            .field("phase", &self.inner.phase.get())
            .field("subscription", &self.inner.subscription.get())
            .finish_non_exhaustive()
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use crate::platform::SimulatedViewport;

    use super::*;

    fn recording_handler() -> (Rc<RefCell<Vec<bool>>>, Handler) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, Box::new(move |v: bool| sink.borrow_mut().push(v)))
    }

    fn predicate(text: &str) -> Predicate {
        Predicate::new(text).unwrap()
    }

    #[test]
    fn construction_reports_initial_state_once() {
        let vp = SimulatedViewport::shared(1200, 800);
        let (seen, handler) = recording_handler();
        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();

        assert_eq!(*seen.borrow(), vec![false]);
        assert_eq!(binding.matches(), Some(false));
        assert_eq!(binding.phase(), Phase::Active);
        assert_eq!(vp.subscription_count(), 1);
    }

    #[test]
    fn duplicate_notifications_are_ignored() {
        let vp = SimulatedViewport::shared(700, 500);
        let (seen, handler) = recording_handler();
        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();

        binding.inner.on_change(true);
        binding.inner.on_change(true);
        binding.inner.on_change(false);
        binding.inner.on_change(false);

        assert_eq!(*seen.borrow(), vec![true, false]);
    }

    #[test]
    fn destroy_is_idempotent_and_clears_fields() {
        let vp = SimulatedViewport::shared(700, 500);
        let (seen, handler) = recording_handler();
        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();

        binding.destroy();
        binding.destroy();

        assert_eq!(binding.phase(), Phase::Destroyed);
        assert_eq!(binding.matches(), None);
        assert_eq!(binding.predicate(), None);
        assert!(binding.inner.handler.borrow().is_none());
        assert!(binding.inner.subscription.get().is_none());
        assert_eq!(vp.subscription_count(), 0);

        binding.inner.on_change(false);
        assert_eq!(*seen.borrow(), vec![true]);
    }

    #[test]
    fn unsupported_predicate_leaves_no_subscription() {
        let vp = SimulatedViewport::shared(700, 500);
        let (seen, handler) = recording_handler();
        let err = Binding::new(predicate("(pointer: coarse)"), handler, vp.clone()).unwrap_err();

        assert!(err.is_platform());
        assert!(seen.borrow().is_empty());
        assert_eq!(vp.subscription_count(), 0);
    }

    #[test]
    fn nested_notification_is_folded_into_follow_up_call() {
        let vp = SimulatedViewport::shared(700, 500);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Weak<BindingInner>>>> = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        let target = Rc::clone(&slot);
        let handler: Handler = Box::new(move |v: bool| {
            sink.borrow_mut().push(v);
            // While reporting `false`, a nested notification flips it back.
            if !v {
                if let Some(inner) = target.borrow().as_ref().and_then(Weak::upgrade) {
                    inner.on_change(true);
                }
            }
        });

        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();
        *slot.borrow_mut() = Some(Rc::downgrade(&binding.inner));

        binding.inner.on_change(false);

        assert_eq!(*seen.borrow(), vec![true, false, true]);
        assert_eq!(binding.matches(), Some(true));
    }

    #[test]
    fn handler_destroying_its_binding_is_dropped() {
        let vp = SimulatedViewport::shared(700, 500);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Weak<BindingInner>>>> = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        let target = Rc::clone(&slot);
        let handler: Handler = Box::new(move |v: bool| {
            sink.borrow_mut().push(v);
            if let Some(inner) = target.borrow().as_ref().and_then(Weak::upgrade) {
                inner.destroy();
            }
        });

        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();
        *slot.borrow_mut() = Some(Rc::downgrade(&binding.inner));

        binding.inner.on_change(false);
        binding.inner.on_change(true);

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert_eq!(binding.phase(), Phase::Destroyed);
        assert!(binding.inner.handler.borrow().is_none());
    }

    #[test]
    fn flip_and_back_during_handler_is_folded_away() {
        let vp = SimulatedViewport::shared(700, 500);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Weak<BindingInner>>>> = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        let target = Rc::clone(&slot);
        let handler: Handler = Box::new(move |v: bool| {
            sink.borrow_mut().push(v);
            if !v {
                if let Some(inner) = target.borrow().as_ref().and_then(Weak::upgrade) {
                    inner.on_change(true);
                    inner.on_change(false);
                }
            }
        });

        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();
        *slot.borrow_mut() = Some(Rc::downgrade(&binding.inner));

        binding.inner.on_change(false);

        assert_eq!(*seen.borrow(), vec![true, false]);
        assert_eq!(binding.matches(), Some(false));
    }

    #[test]
    fn panicking_handler_keeps_receiving_notifications() {
        let vp = SimulatedViewport::shared(700, 500);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let panicked = Rc::new(Cell::new(false));

        let sink = Rc::clone(&seen);
        let flag = Rc::clone(&panicked);
        let handler: Handler = Box::new(move |v: bool| {
            sink.borrow_mut().push(v);
            if !v && !flag.replace(true) {
                panic!("handler failure");
            }
        });

        let binding = Binding::new(predicate("(max-width: 768px)"), handler, vp.clone()).unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| binding.inner.on_change(false)));
        assert!(result.is_err());
        assert!(!binding.inner.dispatching.get());
        assert!(binding.inner.handler.borrow().is_some());

        binding.inner.on_change(true);
        binding.inner.on_change(false);

        assert_eq!(*seen.borrow(), vec![true, false, true, false]);
        assert_eq!(binding.phase(), Phase::Active);
    }
}
