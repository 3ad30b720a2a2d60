//! Synchronous named-event bus.
//!
//! This crate provides [`EventBus`], the publish/subscribe foundation the
//! taglink pipeline uses to decouple outcome producers from the host
//! application consuming them. It is deliberately small and independent of
//! the rest of the workspace so it can be tested (and reused) on its own.
//!
//! # Dispatch model
//!
//! Emission is synchronous and runs on the calling thread: every handler
//! registered for the event at emit time is invoked, in registration order,
//! before [`EventBus::emit`] returns. The handler list is snapshotted before
//! iteration, so handlers registered or removed during a dispatch do not
//! affect the emission already in flight.
//!
//! # Fault isolation
//!
//! A panic raised inside one handler is caught, logged via `tracing`, and
//! neither prevents the remaining handlers of the same emission from running
//! nor propagates to the caller of `emit`.
//!
//! # Example
//!
//! ```
//! use taglink_events::EventBus;
//!
//! let bus: EventBus<String> = EventBus::new();
//! let id = bus.on("greeting", |payload| println!("got: {payload}"));
//!
//! assert!(bus.emit("greeting", &"hello".to_string()));
//! bus.off("greeting", Some(id));
//! assert!(!bus.emit("greeting", &"hello".to_string()));
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;
use tracing::error;

/// Opaque token identifying one handler registration.
///
/// Rust closures have no usable identity, so removal is keyed by the token
/// returned from [`EventBus::on`] / [`EventBus::once`] instead. Registering
/// the same closure twice yields two distinct tokens, and both registrations
/// fire once per emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration<P> {
    id: HandlerId,
    callback: Rc<RefCell<dyn FnMut(&P)>>,
    once: bool,
}

impl<P> Clone for Registration<P> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Rc::clone(&self.callback),
            once: self.once,
        }
    }
}

/// Synchronous publish/subscribe dispatcher keyed by event name.
///
/// `P` is the payload type handed to handlers by reference. Subscription and
/// emission both work through `&self` (interior mutability), so a handler may
/// subscribe or unsubscribe other handlers while a dispatch is in progress.
///
/// Single-threaded by design: the bus is neither `Send` nor `Sync`, matching
/// the run-to-completion execution model of the pipeline that owns it.
pub struct EventBus<P> {
    listeners: RefCell<HashMap<String, Vec<Registration<P>>>>,
    next_id: Cell<u64>,
}

impl<P> EventBus<P> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    fn register(
        &self,
        event: impl Into<String>,
        callback: impl FnMut(&P) + 'static,
        once: bool,
    ) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        self.listeners
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(Registration {
                id,
                callback: Rc::new(RefCell::new(callback)),
                once,
            });
        id
    }

    /// Register a handler for `event`.
    ///
    /// The same closure may be registered multiple times; each registration
    /// fires once per emission, in registration order. Returns the token
    /// used to remove this specific registration.
    pub fn on(&self, event: impl Into<String>, handler: impl FnMut(&P) + 'static) -> HandlerId {
        self.register(event, handler, false)
    }

    /// Register a handler that automatically unregisters after its first
    /// invocation.
    ///
    /// The registration is removed from the live list before the handler
    /// runs, so a `once` handler never fires twice even if its own body
    /// re-emits the event.
    pub fn once(&self, event: impl Into<String>, handler: impl FnMut(&P) + 'static) -> HandlerId {
        self.register(event, handler, true)
    }

    /// Remove handlers for `event`.
    ///
    /// With `Some(id)`, removes only the registration carrying that token;
    /// with `None`, clears every handler for the event. Returns whether
    /// anything was removed.
    pub fn off(&self, event: &str, id: Option<HandlerId>) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(registrations) = listeners.get_mut(event) else {
            return false;
        };

        let before = registrations.len();
        match id {
            Some(id) => registrations.retain(|r| r.id != id),
            None => registrations.clear(),
        }
        registrations.len() < before
    }

    /// Remove every handler for one event, or for all events.
    pub fn remove_all(&self, event: Option<&str>) {
        let mut listeners = self.listeners.borrow_mut();
        match event {
            Some(event) => {
                listeners.remove(event);
            }
            None => listeners.clear(),
        }
    }

    /// Invoke every handler currently registered for `event`.
    ///
    /// Handlers run synchronously on the calling thread, in registration
    /// order, against a snapshot of the registration list taken at emit
    /// time. Returns whether at least one handler existed when the emission
    /// started.
    ///
    /// A panicking handler is logged and skipped; it does not stop the
    /// remaining handlers and does not propagate to the caller.
    pub fn emit(&self, event: &str, payload: &P) -> bool {
        let snapshot: Vec<Registration<P>> = {
            let mut listeners = self.listeners.borrow_mut();
            let Some(registrations) = listeners.get_mut(event) else {
                return false;
            };
            if registrations.is_empty() {
                return false;
            }
            let snapshot = registrations.clone();
            // once-handlers unregister before their first delivery
            registrations.retain(|r| !r.once);
            snapshot
        };

        for registration in snapshot {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                (registration.callback.borrow_mut())(payload);
            }));
            if outcome.is_err() {
                error!(event, "event handler panicked during dispatch");
            }
        }
        true
    }

    /// Number of live registrations for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .get(event)
            .map_or(0, |registrations| registrations.len())
    }
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_bus() -> (EventBus<u32>, Rc<RefCell<Vec<u32>>>) {
        (EventBus::new(), Rc::new(RefCell::new(Vec::new())))
    }

    #[test]
    fn test_emit_invokes_handlers_in_registration_order() {
        let (bus, seen) = counting_bus();

        let first = Rc::clone(&seen);
        bus.on("data", move |value| first.borrow_mut().push(*value));
        let second = Rc::clone(&seen);
        bus.on("data", move |value| second.borrow_mut().push(*value + 100));

        assert!(bus.emit("data", &1));
        assert_eq!(*seen.borrow(), vec![1, 101]);
    }

    #[test]
    fn test_emit_without_handlers_returns_false() {
        let bus: EventBus<u32> = EventBus::new();
        assert!(!bus.emit("data", &1));
    }

    #[test]
    fn test_duplicate_registrations_fire_once_each() {
        let (bus, seen) = counting_bus();
        for _ in 0..3 {
            let sink = Rc::clone(&seen);
            bus.on("data", move |value| sink.borrow_mut().push(*value));
        }

        bus.emit("data", &7);
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_once_fires_exactly_once() {
        let (bus, seen) = counting_bus();
        let sink = Rc::clone(&seen);
        bus.once("data", move |value| sink.borrow_mut().push(*value));

        bus.emit("data", &1);
        bus.emit("data", &2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(bus.handler_count("data"), 0);
    }

    #[test]
    fn test_off_with_id_removes_only_that_registration() {
        let (bus, seen) = counting_bus();

        let keep = Rc::clone(&seen);
        bus.on("data", move |value| keep.borrow_mut().push(*value));
        let drop_sink = Rc::clone(&seen);
        let id = bus.on("data", move |value| drop_sink.borrow_mut().push(*value + 100));

        assert!(bus.off("data", Some(id)));
        bus.emit("data", &1);

        assert_eq!(*seen.borrow(), vec![1]);
    }

    #[test]
    fn test_off_without_id_clears_event() {
        let (bus, seen) = counting_bus();
        let sink = Rc::clone(&seen);
        bus.on("data", move |value| sink.borrow_mut().push(*value));

        assert!(bus.off("data", None));
        assert!(!bus.emit("data", &1));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_off_unknown_event_returns_false() {
        let bus: EventBus<u32> = EventBus::new();
        assert!(!bus.off("missing", None));
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let (bus, seen) = counting_bus();

        bus.on("data", |_| panic!("handler exploded"));
        let sink = Rc::clone(&seen);
        bus.on("data", move |value| sink.borrow_mut().push(*value));

        // emit must neither panic nor skip the second handler
        assert!(bus.emit("data", &5));
        assert_eq!(*seen.borrow(), vec![5]);
    }

    #[test]
    fn test_handler_added_during_dispatch_misses_current_emission() {
        let bus: Rc<EventBus<u32>> = Rc::new(EventBus::new());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_bus = Rc::clone(&bus);
        let inner_seen = Rc::clone(&seen);
        bus.on("data", move |value| {
            inner_seen.borrow_mut().push(*value);
            let late_seen = Rc::clone(&inner_seen);
            inner_bus.on("data", move |value| late_seen.borrow_mut().push(*value + 100));
        });

        bus.emit("data", &1);
        assert_eq!(*seen.borrow(), vec![1]);

        bus.emit("data", &2);
        assert_eq!(*seen.borrow(), vec![1, 2, 102]);
        // second emission registered yet another late handler
        assert_eq!(bus.handler_count("data"), 3);
    }

    #[test]
    fn test_remove_all_clears_one_or_every_event() {
        let bus: EventBus<u32> = EventBus::new();
        bus.on("a", |_| {});
        bus.on("b", |_| {});

        bus.remove_all(Some("a"));
        assert_eq!(bus.handler_count("a"), 0);
        assert_eq!(bus.handler_count("b"), 1);

        bus.remove_all(None);
        assert_eq!(bus.handler_count("b"), 0);
    }
}
