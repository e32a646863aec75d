//! Registry behaviour against evaluators that break the platform contract.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use breakpoints::{Listener, PlatformError, PredicateEvaluator, Registry, SubscriptionHandle};

/// Evaluator that keeps listeners after `unsubscribe` and delivers whatever it
/// is told to, duplicates included.
#[derive(Default)]
struct LeakyEvaluator {
    value: Cell<bool>,
    listeners: RefCell<BTreeMap<SubscriptionHandle, Listener>>,
    released: RefCell<Vec<SubscriptionHandle>>,
    next: Cell<u64>,
    fail_evaluate: Cell<bool>,
    deliver_on_subscribe: Cell<Option<bool>>,
}

impl LeakyEvaluator {
    fn deliver(&self, value: bool) {
        let listeners: Vec<Listener> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(value);
        }
    }
}

impl PredicateEvaluator for LeakyEvaluator {
    fn evaluate(&self, _predicate: &str) -> Result<bool, PlatformError> {
        if self.fail_evaluate.get() {
            return Err(PlatformError::backend("evaluate failed"));
        }
        Ok(self.value.get())
    }

    fn subscribe(&self, _predicate: &str, on_change: Listener) -> Result<SubscriptionHandle, PlatformError> {
        let handle = SubscriptionHandle::new(self.next.get());
        self.next.set(self.next.get() + 1);
        if let Some(v) = self.deliver_on_subscribe.get() {
            on_change(v);
        }
        self.listeners.borrow_mut().insert(handle, on_change);
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.released.borrow_mut().push(handle);
    }
}

fn recorder() -> (Rc<RefCell<Vec<bool>>>, impl FnMut(bool) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, move |v: bool| sink.borrow_mut().push(v))
}

#[test]
fn duplicate_deliveries_fire_once() {
    let platform = Rc::new(LeakyEvaluator::default());
    let registry = Registry::with_evaluator(platform.clone());
    let (seen, handler) = recorder();
    registry.register("(max-width: 768px)", handler).unwrap();

    platform.deliver(false);
    platform.deliver(true);
    platform.deliver(true);
    platform.deliver(true);
    platform.deliver(false);
    platform.deliver(false);

    assert_eq!(*seen.borrow(), vec![false, true, false]);
}

#[test]
fn stale_deliveries_after_deregister_are_ignored() {
    let platform = Rc::new(LeakyEvaluator::default());
    let registry = Registry::with_evaluator(platform.clone());
    let (seen, handler) = recorder();
    let handle = registry.register("(max-width: 768px)", handler).unwrap();

    registry.deregister(handle);
    platform.deliver(true);
    platform.deliver(false);
    platform.deliver(true);

    assert_eq!(*seen.borrow(), vec![false]);
    assert_eq!(platform.released.borrow().len(), 1);
}

#[test]
fn stale_deliveries_after_destroy_are_ignored() {
    let platform = Rc::new(LeakyEvaluator::default());
    let registry = Registry::with_evaluator(platform.clone());
    let (a_seen, a) = recorder();
    let (b_seen, b) = recorder();
    registry.register("(max-width: 768px)", a).unwrap();
    registry.register("(max-width: 768px)", b).unwrap();

    registry.destroy();
    registry.destroy();
    platform.deliver(true);

    assert_eq!(*a_seen.borrow(), vec![false]);
    assert_eq!(*b_seen.borrow(), vec![false]);
    // Released front to back, each exactly once.
    assert_eq!(
        *platform.released.borrow(),
        vec![SubscriptionHandle::new(0), SubscriptionHandle::new(1)]
    );
}

#[test]
fn evaluate_failure_releases_the_fresh_subscription() {
    let platform = Rc::new(LeakyEvaluator::default());
    platform.fail_evaluate.set(true);
    let registry = Registry::with_evaluator(platform.clone());
    let (seen, handler) = recorder();

    let err = registry.register("(max-width: 768px)", handler).unwrap_err();

    assert!(err.is_platform());
    assert!(seen.borrow().is_empty());
    assert!(registry.is_empty());
    assert_eq!(*platform.released.borrow(), vec![SubscriptionHandle::new(0)]);

    platform.deliver(true);
    assert!(seen.borrow().is_empty());
}

#[test]
fn delivery_during_subscribe_does_not_preempt_initial_report() {
    let platform = Rc::new(LeakyEvaluator::default());
    platform.value.set(true);
    platform.deliver_on_subscribe.set(Some(false));
    let registry = Registry::with_evaluator(platform.clone());
    let (seen, handler) = recorder();

    let handle = registry.register("(max-width: 768px)", handler).unwrap();

    assert_eq!(*seen.borrow(), vec![true]);
    assert_eq!(registry.current(handle), Some(true));
}
