#![forbid(unsafe_code)]

//! Pointer tracker: republishes raw pointer coordinates.
//!
//! No filtering, clamping, throttling or smoothing happens here. Redundant
//! positions are absorbed by the store, which only publishes distinct
//! changes.

use std::cell::Cell;
use std::rc::Rc;

use scrollstage_core::PointerPosition;
use tracing::{trace, warn};

use crate::host::PointerSource;
use crate::narrative::NarrativeWriter;
use crate::subscription::{Listener, SubscriptionGuard};

/// Subscribes to pointer moves for as long as it stays mounted.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerTracker;

impl PointerTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Subscribe to `host` and publish every position through `writer`.
    ///
    /// If the host has no pointer events the tracker stays idle and the
    /// pointer keeps its initial value.
    pub fn mount(self, host: &mut impl PointerSource, writer: NarrativeWriter) -> MountedTracker {
        let events_seen = Rc::new(Cell::new(0u64));
        let counter = Rc::clone(&events_seen);
        let listener = Listener::new(move |position: PointerPosition| {
            counter.set(counter.get() + 1);
            if writer.set_pointer(position) {
                trace!(x = position.x, y = position.y, "pointer published");
            }
        });

        let guard = match host.subscribe_pointer(listener) {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "pointer events unavailable; pointer stays at initial value");
                None
            }
        };

        MountedTracker { guard, events_seen }
    }
}

/// A mounted tracker. Dropping it unsubscribes.
#[derive(Debug)]
pub struct MountedTracker {
    guard: Option<SubscriptionGuard>,
    events_seen: Rc<Cell<u64>>,
}

impl MountedTracker {
    /// Whether a host subscription is active.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.guard.is_some()
    }

    /// Pointer events delivered so far, including ones that did not change
    /// the published position.
    #[must_use]
    pub fn events_seen(&self) -> u64 {
        self.events_seen.get()
    }

    /// Unsubscribe now. Equivalent to dropping.
    pub fn unmount(mut self) {
        self.guard.take();
    }
}
