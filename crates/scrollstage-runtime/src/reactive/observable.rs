#![forbid(unsafe_code)]

//! Version-tracked shared value with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] keeps a value in `Rc<RefCell<..>>` storage. A write that
//! changes the value (by `PartialEq`) bumps the version and notifies every
//! live subscriber in registration order. Writes of an equal value are
//! dropped silently, which is what keeps consumers from re-rendering on
//! redundant pointer or stage reports.
//!
//! Everything here is single-threaded: the narrative runs on the host's
//! event loop and never crosses threads.
//!
//! # Failure Modes
//!
//! - **Leaked guards**: callbacks live as long as their [`ChangeSubscription`].
//!   Dead entries are pruned lazily on the next notify.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{trace, trace_span};
use web_time::Instant;

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Clones are handles to the same value and subscriber list.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 per value-changing write.
/// 2. `set(v)` with `v == current` is a no-op.
/// 3. Subscribers are notified in registration order.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// New observable at version 0 with no subscribers.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value. Returns `true` if it changed (and subscribers were
    /// notified or queued).
    pub fn set(&self, value: T) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
        true
    }

    /// Modify the value in place. Returns `true` if it changed.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value != old {
                inner.version += 1;
                true
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Register a change callback. Dropping the returned guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> ChangeSubscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        self.inner
            .borrow_mut()
            .subscribers
            .push(Rc::downgrade(&strong));
        ChangeSubscription {
            _guard: Box::new(strong),
        }
    }

    /// Current version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    fn notify(&self) {
        let callbacks: Vec<CallbackWeak<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            inner.subscribers.clone()
        };

        if callbacks.is_empty() {
            return;
        }

        // Callbacks are held weakly until the moment they run, so a
        // subscription dropped before then is never called.
        if super::batch::is_batching() {
            for cb in callbacks {
                let key = Weak::as_ptr(&cb) as *const () as usize;
                let source = self.clone();
                super::batch::defer_or_run_keyed(key, move || {
                    if let Some(cb) = cb.upgrade() {
                        let latest = source.get();
                        cb(&latest);
                    }
                });
            }
            return;
        }

        let value = self.inner.borrow().value.clone();
        let subscribers = callbacks.len() as u64;
        let start = Instant::now();
        let _span = trace_span!("observable.notify", subscribers).entered();
        for cb in &callbacks {
            if let Some(cb) = cb.upgrade() {
                cb(&value);
            }
        }
        trace!(
            subscribers,
            duration_us = start.elapsed().as_micros() as u64,
            "observable notified"
        );
    }
}

/// RAII guard for an [`Observable`] callback.
///
/// Dropping it drops the only strong reference to the callback, so it can
/// never run again.
pub struct ChangeSubscription {
    _guard: Box<dyn std::any::Any>,
}

impl std::fmt::Debug for ChangeSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSubscription").finish_non_exhaustive()
    }
}
