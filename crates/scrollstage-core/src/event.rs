#![forbid(unsafe_code)]

//! Canonical host events and host capability flags.
//!
//! Hosts deliver two independent event streams: pointer moves and
//! intersection batches. Ordering is guaranteed within each stream, never
//! between them.

use bitflags::bitflags;

use crate::observation::SectionObservation;
use crate::pointer::PointerPosition;

/// One event delivered by the host environment.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// The pointer moved to a new viewport position.
    PointerMove(PointerPosition),

    /// One batch of intersection changes, delivered together before the
    /// next render. Order within the batch is the watcher's delivery order.
    Intersections(Vec<SectionObservation>),
}

impl HostEvent {
    /// Pointer move at `(x, y)`.
    #[must_use]
    pub fn pointer(x: f64, y: f64) -> Self {
        Self::PointerMove(PointerPosition::new(x, y))
    }

    /// Whether this event belongs to the pointer stream.
    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Self::PointerMove(_))
    }
}

bitflags! {
    /// Event mechanisms a host environment provides.
    ///
    /// Missing capabilities are not errors: the corresponding component
    /// simply never publishes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCapabilities: u8 {
        /// Viewport-wide pointer-move events.
        const POINTER_EVENTS = 0b0000_0001;
        /// Viewport intersection watching.
        const INTERSECTION_WATCH = 0b0000_0010;
    }
}

impl HostCapabilities {
    /// An interactive browser-like host.
    pub const INTERACTIVE: HostCapabilities = HostCapabilities::all();

    /// A non-interactive host (static render, test runner without a document).
    pub const HEADLESS: HostCapabilities = HostCapabilities::empty();
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageId;

    #[test]
    fn pointer_constructor() {
        let ev = HostEvent::pointer(320.0, 140.0);
        assert!(ev.is_pointer());
        assert_eq!(ev, HostEvent::PointerMove(PointerPosition::new(320.0, 140.0)));
    }

    #[test]
    fn intersections_are_not_pointer_events() {
        let ev = HostEvent::Intersections(vec![SectionObservation::entering(StageId::Intent, 0.6)]);
        assert!(!ev.is_pointer());
    }

    #[test]
    fn default_capabilities_are_interactive() {
        let caps = HostCapabilities::default();
        assert!(caps.contains(HostCapabilities::POINTER_EVENTS));
        assert!(caps.contains(HostCapabilities::INTERSECTION_WATCH));
        assert!(HostCapabilities::HEADLESS.is_empty());
    }
}
