#![forbid(unsafe_code)]

//! Scoped host subscriptions.
//!
//! Every host event stream (pointer moves, intersection batches) is acquired
//! through a [`SubscriptionGuard`] and released when the guard drops, on every
//! exit path. The host keeps a [`Listener`] to deliver events; the listener
//! shares a stop flag with the guard, so once the guard is gone the listener
//! is inert and any late host callback is a no-op.
//!
//! # How it works
//!
//! 1. A component wraps its callback with [`Listener::new`].
//! 2. It hands the listener to the host, which registers its native callback
//!    and returns a [`SubscriptionGuard`] built from the listener plus an
//!    optional release closure that unregisters the native callback.
//! 3. Dropping the guard trips the stop flag first, then runs the release
//!    closure. Both happen synchronously.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

/// Identifier for a subscription, unique per host.
pub type SubId = u64;

/// Shared stop flag observed by a [`Listener`].
#[derive(Clone, Default)]
pub struct StopSignal {
    stopped: Rc<Cell<bool>>,
}

impl StopSignal {
    /// Whether the owning guard has been released.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopSignal")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The guard-side half of a [`StopSignal`].
#[derive(Debug)]
struct StopTrigger {
    signal: StopSignal,
}

impl StopTrigger {
    fn stop(&self) {
        self.signal.stopped.set(true);
    }
}

type Callback<E> = Box<dyn FnMut(E)>;

struct ListenerInner<E> {
    signal: StopSignal,
    callback: RefCell<Option<Callback<E>>>,
}

/// Host-held delivery endpoint for one event stream.
///
/// Clones share the same callback and stop flag.
pub struct Listener<E> {
    inner: Rc<ListenerInner<E>>,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("stopped", &self.inner.signal.is_stopped())
            .finish_non_exhaustive()
    }
}

impl<E: 'static> Listener<E> {
    /// Wrap `callback` in a live listener.
    pub fn new(callback: impl FnMut(E) + 'static) -> Self {
        Self {
            inner: Rc::new(ListenerInner {
                signal: StopSignal::default(),
                callback: RefCell::new(Some(Box::new(callback))),
            }),
        }
    }

    /// Deliver one event.
    ///
    /// Returns `false` without calling anything if the subscription has been
    /// released, or if this listener is already running (a re-entrant emit
    /// from inside its own callback).
    pub fn emit(&self, event: E) -> bool {
        if self.inner.signal.is_stopped() {
            trace!("event dropped: listener released");
            return false;
        }
        let Ok(mut slot) = self.inner.callback.try_borrow_mut() else {
            debug!("event dropped: re-entrant delivery");
            return false;
        };
        let Some(callback) = slot.as_mut() else {
            return false;
        };
        callback(event);
        // The callback may have released its own guard.
        if self.inner.signal.is_stopped() {
            *slot = None;
        }
        true
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.signal.is_stopped()
    }

    /// Stop signal shared with the guard.
    #[must_use]
    pub fn signal(&self) -> StopSignal {
        self.inner.signal.clone()
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.inner.callback.try_borrow_mut() {
            *slot = None;
        }
    }
}

/// RAII handle for an active host subscription.
///
/// Dropping it (or calling [`SubscriptionGuard::release`]) stops delivery
/// and unregisters the native callback.
pub struct SubscriptionGuard {
    id: SubId,
    label: &'static str,
    trigger: StopTrigger,
    release: Option<Box<dyn FnOnce()>>,
    clear: Option<Box<dyn FnOnce()>>,
}

impl SubscriptionGuard {
    /// Guard for `listener`, with an optional closure that unregisters the
    /// host's native callback.
    pub fn new<E: 'static>(
        id: SubId,
        label: &'static str,
        listener: &Listener<E>,
        release: Option<Box<dyn FnOnce()>>,
    ) -> Self {
        debug!(sub_id = id, label, "subscription started");
        let trigger = StopTrigger {
            signal: listener.signal(),
        };
        let listener = listener.clone();
        Self {
            id,
            label,
            trigger,
            release,
            clear: Some(Box::new(move || listener.clear())),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubId {
        self.id
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Release now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        // Stop first so nothing the release closure triggers can be delivered.
        self.trigger.stop();
        if let Some(clear) = self.clear.take() {
            clear();
        }
        if let Some(release) = self.release.take() {
            release();
        }
        debug!(sub_id = self.id, label = self.label, "subscription stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_listener() -> (Listener<u32>, Rc<Cell<u32>>) {
        let total = Rc::new(Cell::new(0u32));
        let total_clone = Rc::clone(&total);
        let listener = Listener::new(move |n: u32| total_clone.set(total_clone.get() + n));
        (listener, total)
    }

    #[test]
    fn emit_delivers_while_active() {
        let (listener, total) = counting_listener();
        let _guard = SubscriptionGuard::new(1, "test", &listener, None);
        assert!(listener.emit(3));
        assert!(listener.emit(4));
        assert_eq!(total.get(), 7);
    }

    #[test]
    fn drop_makes_listener_inert() {
        let (listener, total) = counting_listener();
        let guard = SubscriptionGuard::new(1, "test", &listener, None);
        listener.emit(1);
        drop(guard);
        assert!(listener.is_stopped());
        assert!(!listener.emit(100));
        assert_eq!(total.get(), 1);
    }

    #[test]
    fn release_closure_runs_exactly_once() {
        let released = Rc::new(Cell::new(0u32));
        let released_clone = Rc::clone(&released);
        let (listener, _total) = counting_listener();
        let guard = SubscriptionGuard::new(
            2,
            "test",
            &listener,
            Some(Box::new(move || released_clone.set(released_clone.get() + 1))),
        );
        guard.release();
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn release_closure_sees_stopped_listener() {
        let (listener, total) = counting_listener();
        let late = listener.clone();
        let guard = SubscriptionGuard::new(
            3,
            "test",
            &listener,
            Some(Box::new(move || {
                // A host flushing one last event during unregister.
                assert!(!late.emit(50));
            })),
        );
        drop(guard);
        assert_eq!(total.get(), 0);
    }

    #[test]
    fn callback_may_release_its_own_guard() {
        let holder: Rc<RefCell<Option<SubscriptionGuard>>> = Rc::new(RefCell::new(None));
        let holder_clone = Rc::clone(&holder);
        let calls = Rc::new(Cell::new(0u32));
        let calls_clone = Rc::clone(&calls);
        let listener = Listener::new(move |_: ()| {
            calls_clone.set(calls_clone.get() + 1);
            holder_clone.borrow_mut().take();
        });
        *holder.borrow_mut() = Some(SubscriptionGuard::new(4, "test", &listener, None));

        assert!(listener.emit(()));
        assert!(!listener.emit(()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn listener_debug_reports_stop_state() {
        let (listener, _total) = counting_listener();
        let guard = SubscriptionGuard::new(6, "test", &listener, None);
        assert!(format!("{listener:?}").contains("stopped: false"));
        drop(guard);
        assert!(format!("{listener:?}").contains("stopped: true"));
    }

    #[test]
    fn reentrant_emit_is_dropped() {
        let slot: Rc<RefCell<Option<Listener<u32>>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let nested = Rc::new(Cell::new(true));
        let nested_clone = Rc::clone(&nested);
        let listener = Listener::new(move |n: u32| {
            if n == 0
                && let Some(me) = slot_clone.borrow().as_ref()
            {
                nested_clone.set(me.emit(1));
            }
        });
        *slot.borrow_mut() = Some(listener.clone());
        let _guard = SubscriptionGuard::new(5, "test", &listener, None);

        assert!(listener.emit(0));
        assert!(!nested.get());
    }
}
