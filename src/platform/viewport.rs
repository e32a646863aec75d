//! In-process reference evaluator.
//!
//! `SimulatedViewport` models a host whose viewport can be resized and whose
//! media type can switch between screen and print. It is intended for tests,
//! headless use, and as a reference implementation of `PredicateEvaluator`.
//!
//! Changes are not delivered synchronously. `resize` and `set_media_type`
//! recompute every subscription and queue one notification per subscription
//! whose value flipped; `dispatch_pending` delivers the queue on the caller's
//! turn, the way a browser delivers `change` events after layout.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

use super::query::{MediaQueryList, QueryContext};
use super::{Host, Listener, PlatformError, PredicateEvaluator, SubscriptionHandle};

pub use super::query::MediaType;

struct Subscription {
    query: MediaQueryList,
    last: bool,
    listener: Listener,
}

#[derive(Debug, Clone, Copy)]
struct Notification {
    handle: SubscriptionHandle,
    matches: bool,
}

/// Simulated viewport with queued change notifications.
pub struct SimulatedViewport {
    context: Cell<QueryContext>,
    subscriptions: RefCell<BTreeMap<SubscriptionHandle, Subscription>>,
    next_handle: Cell<u64>,
    queue_tx: Sender<Notification>,
    queue_rx: Receiver<Notification>,
}

impl SimulatedViewport {
    /// Creates a screen viewport of the given size in CSS pixels.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let (queue_tx, queue_rx) = unbounded();
        Self {
            context: Cell::new(QueryContext {
                width,
                height,
                media_type: MediaType::Screen,
            }),
            subscriptions: RefCell::new(BTreeMap::new()),
            next_handle: Cell::new(1),
            queue_tx,
            queue_rx,
        }
    }

    /// Creates a viewport already wrapped for sharing with a registry.
    #[must_use]
    pub fn shared(width: u32, height: u32) -> Rc<Self> {
        Rc::new(Self::new(width, height))
    }

    /// Current viewport state.
    #[must_use]
    pub fn context(&self) -> QueryContext {
        self.context.get()
    }

    /// Resize the viewport and queue notifications for flipped subscriptions.
    ///
    /// Returns the number of notifications queued.
    pub fn resize(&self, width: u32, height: u32) -> usize {
        let mut ctx = self.context.get();
        ctx.width = width;
        ctx.height = height;
        self.context.set(ctx);
        self.recompute()
    }

    /// Switch the media type and queue notifications for flipped subscriptions.
    pub fn set_media_type(&self, media_type: MediaType) -> usize {
        let mut ctx = self.context.get();
        ctx.media_type = media_type;
        self.context.set(ctx);
        self.recompute()
    }

    /// Deliver every queued notification. Returns how many listeners ran.
    ///
    /// Notifications for subscriptions released since they were queued are
    /// dropped. Listeners may resize the viewport; anything they queue is
    /// delivered by the same call.
    pub fn dispatch_pending(&self) -> usize {
        let mut delivered = 0;
        while let Ok(note) = self.queue_rx.try_recv() {
            let listener = self
                .subscriptions
                .borrow()
                .get(&note.handle)
                .map(|sub| Rc::clone(&sub.listener));

            let Some(listener) = listener else {
                trace!(subscription = %note.handle, "dropping notification for released subscription");
                continue;
            };

            trace!(subscription = %note.handle, matches = note.matches, "delivering notification");
            listener(note.matches);
            delivered += 1;
        }
        delivered
    }

    /// Number of queued, undelivered notifications.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue_rx.len()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    fn recompute(&self) -> usize {
        let ctx = self.context.get();
        let mut queued = 0;
        for (handle, sub) in self.subscriptions.borrow_mut().iter_mut() {
            let now = sub.query.matches(&ctx);
            if now == sub.last {
                continue;
            }
            sub.last = now;
            if self
                .queue_tx
                .send(Notification {
                    handle: *handle,
                    matches: now,
                })
                .is_ok()
            {
                queued += 1;
            }
        }
        trace!(width = ctx.width, height = ctx.height, queued, "viewport changed");
        queued
    }
}

impl Default for SimulatedViewport {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

impl fmt::Debug for SimulatedViewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedViewport")
            .field("context", &self.context.get())
            .field("subscriptions", &self.subscriptions.borrow().len())
            .field("pending", &self.queue_rx.len())
            .finish()
    }
}

impl PredicateEvaluator for SimulatedViewport {
    fn evaluate(&self, predicate: &str) -> Result<bool, PlatformError> {
        let query = MediaQueryList::parse(predicate)?;
        Ok(query.matches(&self.context.get()))
    }

    fn subscribe(&self, predicate: &str, on_change: Listener) -> Result<SubscriptionHandle, PlatformError> {
        let query = MediaQueryList::parse(predicate)?;
        let last = query.matches(&self.context.get());

        let raw = self.next_handle.get();
        self.next_handle.set(raw + 1);
        let handle = SubscriptionHandle::new(raw);

        self.subscriptions.borrow_mut().insert(
            handle,
            Subscription {
                query,
                last,
                listener: on_change,
            },
        );
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.subscriptions.borrow_mut().remove(&handle);
    }
}

impl Host for Rc<SimulatedViewport> {
    fn predicate_evaluator(&self) -> Option<Rc<dyn PredicateEvaluator>> {
        Some(Rc::clone(self) as Rc<dyn PredicateEvaluator>)
    }
}
