#![forbid(unsafe_code)]

//! Publish coalescing for [`Observable`](super::Observable) writes.
//!
//! A single logical update (an intersection batch, or a transaction that
//! touches both stage and pointer) may write the narrative state more than
//! once. Consumers must see one publish carrying the final state, never the
//! intermediate ones. A [`BatchScope`] defers subscriber callbacks until the
//! outermost scope exits, then runs each distinct callback once.
//!
//! # Invariants
//!
//! 1. Nested scopes are supported: only the outermost scope flushes.
//! 2. Inside a scope, `Observable::get()` returns the latest value; only
//!    callbacks are deferred.
//! 3. A callback queued twice under the same key runs once, at the position
//!    of its first enqueue, with the value current at flush time.

use std::cell::RefCell;
use tracing::{debug, debug_span};
use web_time::Instant;

type DeferredNotify = Box<dyn FnOnce()>;

struct BatchContext {
    /// Nesting depth. Flush happens when this returns to 0.
    depth: u32,
    deferred: Vec<(usize, DeferredNotify)>,
}

thread_local! {
    static BATCH_CTX: RefCell<Option<BatchContext>> = const { RefCell::new(None) };
}

/// Returns true if a batch is open on this thread.
pub fn is_batching() -> bool {
    BATCH_CTX.with(|ctx| ctx.borrow().is_some())
}

/// Queue `f` under `key` if a batch is open, otherwise run it now.
///
/// Re-queuing an existing key replaces the earlier callback but keeps its
/// queue position. Returns `true` if deferred.
pub fn defer_or_run_keyed(key: usize, f: impl FnOnce() + 'static) -> bool {
    BATCH_CTX.with(|ctx| {
        let mut guard = ctx.borrow_mut();
        if let Some(ref mut batch) = *guard {
            match batch.deferred.iter_mut().find(|(k, _)| *k == key) {
                Some(entry) => entry.1 = Box::new(f),
                None => batch.deferred.push((key, Box::new(f))),
            }
            true
        } else {
            drop(guard);
            f();
            false
        }
    })
}

fn flush() {
    let deferred: Vec<(usize, DeferredNotify)> = BATCH_CTX.with(|ctx| {
        ctx.borrow_mut()
            .as_mut()
            .map(|batch| std::mem::take(&mut batch.deferred))
            .unwrap_or_default()
    });
    if deferred.is_empty() {
        return;
    }

    let callbacks = deferred.len() as u64;
    let start = Instant::now();
    let _span = debug_span!("narrative.flush", callbacks).entered();
    for (_, notify) in deferred {
        notify();
    }
    debug!(
        callbacks,
        duration_us = start.elapsed().as_micros() as u64,
        "batched publish flushed"
    );
}

/// RAII guard that opens a batch.
///
/// While any `BatchScope` is alive on this thread, observable callbacks are
/// deferred. Dropping the outermost scope flushes them.
#[derive(Debug)]
pub struct BatchScope {
    _private: (),
}

impl BatchScope {
    #[must_use]
    pub fn new() -> Self {
        BATCH_CTX.with(|ctx| {
            let mut guard = ctx.borrow_mut();
            match *guard {
                Some(ref mut batch) => batch.depth += 1,
                None => {
                    *guard = Some(BatchContext {
                        depth: 1,
                        deferred: Vec::new(),
                    });
                }
            }
        });
        Self { _private: () }
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = BATCH_CTX.with(|ctx| match ctx.borrow_mut().as_mut() {
            Some(batch) => {
                batch.depth -= 1;
                batch.depth == 0
            }
            None => false,
        });
        if !outermost {
            return;
        }

        // Clear the context even if a callback panics mid-flush.
        struct ClearOnExit;
        impl Drop for ClearOnExit {
            fn drop(&mut self) {
                BATCH_CTX.with(|ctx| *ctx.borrow_mut() = None);
            }
        }
        let _clear = ClearOnExit;
        flush();
    }
}
