//! Named-event dispatcher with single-winner semantics.
//!
//! A trigger invokes only the first eligible subscription registered for the
//! event name, and hands its return value back to the caller. This is not a
//! broadcast: later subscriptions for the same name run only once every
//! earlier one has become ineligible (a spent `once` subscription).

use std::fmt;

/// Lifecycle event names emitted by the controllers.
pub mod names {
    pub const BEFORE_TOGGLE: &str = "beforeToggle";
    pub const AFTER_TOGGLE: &str = "afterToggle";
    pub const BEFORE_TOGGLE_ON: &str = "beforeToggleOn";
    pub const AFTER_TOGGLE_ON: &str = "afterToggleOn";
    pub const BEFORE_TOGGLE_OFF: &str = "beforeToggleOff";
    pub const AFTER_TOGGLE_OFF: &str = "afterToggleOff";
    pub const TOGGLE: &str = "toggle";
    pub const SCROLL_TOP: &str = "scrollTop";
}

/// Boxed subscription callback.
pub type Handler<C, A, R> = Box<dyn FnMut(&C, &A) -> R>;

struct Subscription<C, A, R> {
    event_name: String,
    handler: Handler<C, A, R>,
    fire_once: bool,
    has_fired: bool,
}

impl<C, A, R> Subscription<C, A, R> {
    fn is_eligible(&self) -> bool {
        !(self.fire_once && self.has_fired)
    }
}

/// Publish/subscribe bus keyed by event name.
///
/// `C` is the context handed to handlers (usually a snapshot of the owning
/// controller), `A` the trigger arguments and `R` the handler return type.
///
/// Spent `once` subscriptions stay in the sequence for the bus's lifetime, so
/// a long-lived bus should not accumulate unbounded one-shot handlers.
pub struct EventBus<C, A = (), R = ()> {
    subscriptions: Vec<Subscription<C, A, R>>,
}

impl<C, A, R> Default for EventBus<C, A, R> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }
}

impl<C, A, R> fmt::Debug for EventBus<C, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.subscriptions
                    .iter()
                    .map(|s| (&s.event_name, s.fire_once, s.has_fired)),
            )
            .finish()
    }
}

impl<C, A, R> EventBus<C, A, R> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Unknown event names are fine; the handler simply
    /// waits until something triggers that name.
    pub fn subscribe<F>(&mut self, event_name: impl Into<String>, handler: F, once: bool)
    where
        F: FnMut(&C, &A) -> R + 'static,
    {
        self.subscriptions.push(Subscription {
            event_name: event_name.into(),
            handler: Box::new(handler),
            fire_once: once,
            has_fired: false,
        });
    }

    /// Register a handler that stays eligible for every trigger.
    pub fn on<F>(&mut self, event_name: impl Into<String>, handler: F)
    where
        F: FnMut(&C, &A) -> R + 'static,
    {
        self.subscribe(event_name, handler, false);
    }

    /// Register a handler that fires at most once.
    pub fn once<F>(&mut self, event_name: impl Into<String>, handler: F)
    where
        F: FnMut(&C, &A) -> R + 'static,
    {
        self.subscribe(event_name, handler, true);
    }

    /// Invoke the first eligible handler for `event_name`.
    ///
    /// Returns the handler's value, or `None` when nothing matched.
    pub fn trigger(&mut self, event_name: &str, context: &C, args: &A) -> Option<R> {
        let subscription = self
            .subscriptions
            .iter_mut()
            .find(|s| s.event_name == event_name && s.is_eligible())?;
        subscription.has_fired = true;
        Some((subscription.handler)(context, args))
    }

    /// Whether a trigger of `event_name` would reach a handler.
    pub fn has_listeners(&self, event_name: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|s| s.event_name == event_name && s.is_eligible())
    }

    /// Total subscriptions held, spent ones included.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}
