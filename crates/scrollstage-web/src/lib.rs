#![forbid(unsafe_code)]

//! `scrollstage-web` provides host implementations for the scrollstage
//! runtime.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment pushes pointer moves and
//!   intersection batches; nothing is delivered until it calls
//!   [`WebHost::dispatch_pending`].
//! - **Deterministic**: [`SimulatedViewport`] derives intersection batches
//!   from section rectangles and a scroll offset, so scroll scenarios run
//!   natively in tests.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! On `wasm32` the crate also exports [`NarrativeRunner`], which binds the
//! runtime to the real document through `wasm-bindgen`.

#[cfg(feature = "input-parser")]
pub mod input_parser;
pub mod viewport;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::NarrativeRunner;

pub use viewport::SimulatedViewport;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use scrollstage_core::{
    HostCapabilities, HostEvent, ObserverOptions, PointerPosition, SectionObservation, StageId,
};
use scrollstage_runtime::{
    HostError, IntersectionSource, Listener, PointerSource, SubId, SubscriptionGuard,
};

/// Counts from one [`WebHost::dispatch_pending`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Pointer events delivered to at least one listener.
    pub pointer_events: u32,
    /// Intersection batches delivered to at least one watcher.
    pub batches: u32,
    /// Events no live listener accepted.
    pub dropped: u32,
}

impl DispatchStats {
    /// Events taken off the queue.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.pointer_events + self.batches + self.dropped
    }
}

struct Watch {
    id: SubId,
    stages: Vec<StageId>,
    listener: Listener<Vec<SectionObservation>>,
}

#[derive(Default)]
struct Registrations {
    next_id: SubId,
    pointer: Vec<(SubId, Listener<PointerPosition>)>,
    watches: Vec<Watch>,
    options: Option<ObserverOptions>,
}

/// Host-driven event source for the narrative runtime.
///
/// The embedding environment pushes [`HostEvent`]s; they are queued and
/// delivered in push order by [`dispatch_pending`](Self::dispatch_pending).
/// Capabilities can be narrowed to simulate a host that lacks pointer events
/// or intersection watching.
pub struct WebHost {
    capabilities: HostCapabilities,
    queue: VecDeque<HostEvent>,
    registrations: Rc<RefCell<Registrations>>,
}

impl WebHost {
    /// Host with every capability.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(HostCapabilities::INTERACTIVE)
    }

    #[must_use]
    pub fn with_capabilities(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            queue: VecDeque::new(),
            registrations: Rc::new(RefCell::new(Registrations::default())),
        }
    }

    #[must_use]
    pub const fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    /// Queue a pointer move.
    pub fn push_pointer(&mut self, x: f64, y: f64) {
        self.queue.push_back(HostEvent::pointer(x, y));
    }

    /// Queue one intersection batch. Empty batches are queued too.
    pub fn push_intersections(&mut self, batch: Vec<SectionObservation>) {
        self.queue.push_back(HostEvent::Intersections(batch));
    }

    /// Queue a canonical host event.
    pub fn push_event(&mut self, event: HostEvent) {
        self.queue.push_back(event);
    }

    /// Parse and queue one JSON-encoded host event.
    ///
    /// Returns `Ok(false)` for event kinds with no host mapping.
    #[cfg(feature = "input-parser")]
    pub fn push_encoded(&mut self, json: &str) -> Result<bool, input_parser::InputParseError> {
        match input_parser::parse_encoded_host_event(json)? {
            Some(event) => {
                self.push_event(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Events waiting for dispatch.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Deliver every queued event, in push order.
    pub fn dispatch_pending(&mut self) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(event) = self.queue.pop_front() {
            let delivered = match event {
                HostEvent::PointerMove(position) => {
                    let delivered = self.emit_pointer(position);
                    if delivered {
                        stats.pointer_events += 1;
                    }
                    delivered
                }
                HostEvent::Intersections(batch) => {
                    let delivered = self.emit_batch(&batch);
                    if delivered {
                        stats.batches += 1;
                    }
                    delivered
                }
            };
            if !delivered {
                stats.dropped += 1;
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(
            pointer_events = stats.pointer_events,
            batches = stats.batches,
            dropped = stats.dropped,
            "web host dispatched"
        );
        stats
    }

    /// Stages covered by live intersection watches, in registration order.
    #[must_use]
    pub fn observed_stages(&self) -> Vec<StageId> {
        let registrations = self.registrations.borrow();
        let mut stages = Vec::new();
        for watch in &registrations.watches {
            for stage in &watch.stages {
                if !stages.contains(stage) {
                    stages.push(*stage);
                }
            }
        }
        stages
    }

    /// Options of the most recent intersection watch, if any.
    #[must_use]
    pub fn observer_options(&self) -> Option<ObserverOptions> {
        self.registrations.borrow().options
    }

    /// Live pointer listeners plus live intersection watches.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        let registrations = self.registrations.borrow();
        registrations.pointer.len() + registrations.watches.len()
    }

    fn emit_pointer(&self, position: PointerPosition) -> bool {
        let listeners: Vec<_> = self
            .registrations
            .borrow()
            .pointer
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        listeners
            .iter()
            .fold(false, |delivered, listener| listener.emit(position) || delivered)
    }

    fn emit_batch(&self, batch: &[SectionObservation]) -> bool {
        let watches: Vec<_> = self
            .registrations
            .borrow()
            .watches
            .iter()
            .map(|watch| {
                let entries: Vec<_> = batch
                    .iter()
                    .filter(|obs| watch.stages.contains(&obs.id))
                    .copied()
                    .collect();
                (watch.listener.clone(), entries)
            })
            .collect();
        watches
            .into_iter()
            .fold(false, |delivered, (listener, entries)| {
                listener.emit(entries) || delivered
            })
    }
}

impl Default for WebHost {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for WebHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebHost")
            .field("capabilities", &self.capabilities)
            .field("pending", &self.queue.len())
            .field("live_subscriptions", &self.live_subscriptions())
            .finish()
    }
}

impl PointerSource for WebHost {
    fn subscribe_pointer(
        &mut self,
        listener: Listener<PointerPosition>,
    ) -> Result<SubscriptionGuard, HostError> {
        if !self.capabilities.contains(HostCapabilities::POINTER_EVENTS) {
            return Err(HostError::Unavailable("pointer events"));
        }
        let id = {
            let mut registrations = self.registrations.borrow_mut();
            registrations.next_id += 1;
            let id = registrations.next_id;
            registrations.pointer.push((id, listener.clone()));
            id
        };
        let registrations = Rc::clone(&self.registrations);
        Ok(SubscriptionGuard::new(
            id,
            "web.pointer",
            &listener,
            Some(Box::new(move || {
                registrations
                    .borrow_mut()
                    .pointer
                    .retain(|(sub, _)| *sub != id);
            })),
        ))
    }
}

impl IntersectionSource for WebHost {
    fn observe_sections(
        &mut self,
        stages: &[StageId],
        options: &ObserverOptions,
        listener: Listener<Vec<SectionObservation>>,
    ) -> Result<SubscriptionGuard, HostError> {
        if !self
            .capabilities
            .contains(HostCapabilities::INTERSECTION_WATCH)
        {
            return Err(HostError::Unavailable("intersection watching"));
        }
        if stages.is_empty() {
            return Err(HostError::Rejected("no sections to observe".to_owned()));
        }
        let id = {
            let mut registrations = self.registrations.borrow_mut();
            registrations.next_id += 1;
            let id = registrations.next_id;
            registrations.watches.push(Watch {
                id,
                stages: stages.to_vec(),
                listener: listener.clone(),
            });
            registrations.options = Some(*options);
            id
        };
        let registrations = Rc::clone(&self.registrations);
        Ok(SubscriptionGuard::new(
            id,
            "web.intersections",
            &listener,
            Some(Box::new(move || {
                registrations
                    .borrow_mut()
                    .watches
                    .retain(|watch| watch.id != id);
            })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scrollstage_core::SectionElement;
    use scrollstage_runtime::{Narrative, NarrativeState};

    #[test]
    fn nothing_is_delivered_before_dispatch() {
        let mut host = WebHost::new();
        let mounted = Narrative::new(SectionElement::canonical_document())
            .mount(&mut host)
            .expect("mount");
        host.push_pointer(320.0, 140.0);
        assert_eq!(host.pending(), 1);
        assert_eq!(mounted.read().pointer, PointerPosition::ORIGIN);

        let stats = host.dispatch_pending();
        assert_eq!(
            stats,
            DispatchStats {
                pointer_events: 1,
                batches: 0,
                dropped: 0
            }
        );
        assert_eq!(mounted.read().pointer, PointerPosition::new(320.0, 140.0));
    }

    #[test]
    fn events_dispatch_in_push_order() {
        let mut host = WebHost::new();
        let mounted = Narrative::new(SectionElement::canonical_document())
            .mount(&mut host)
            .expect("mount");
        host.push_intersections(vec![SectionObservation::entering(StageId::Origins, 0.7)]);
        host.push_intersections(vec![SectionObservation::entering(StageId::Feedback, 0.6)]);
        host.push_event(HostEvent::pointer(1.0, 2.0));
        assert_eq!(host.dispatch_pending().total(), 3);
        assert_eq!(mounted.read().active_stage, StageId::Feedback);
        assert_eq!(mounted.read().pointer, PointerPosition::new(1.0, 2.0));
    }

    #[test]
    fn watches_only_see_their_stages() {
        let mut host = WebHost::new();
        let mounted = Narrative::new(vec![SectionElement::new("intent")])
            .mount(&mut host)
            .expect("mount");
        assert_eq!(host.observed_stages(), vec![StageId::Intent]);
        host.push_intersections(vec![
            SectionObservation::entering(StageId::Intent, 0.9),
            SectionObservation::entering(StageId::Footer, 0.9),
        ]);
        host.dispatch_pending();
        assert_eq!(mounted.read().active_stage, StageId::Intent);
    }

    #[test]
    fn events_after_unmount_are_dropped() {
        let mut host = WebHost::new();
        let mounted = Narrative::new(SectionElement::canonical_document())
            .mount(&mut host)
            .expect("mount");
        host.push_pointer(5.0, 5.0);
        host.dispatch_pending();
        let state = mounted.unmount();
        assert_eq!(host.live_subscriptions(), 0);

        host.push_pointer(9.0, 9.0);
        host.push_intersections(vec![SectionObservation::entering(StageId::Footer, 1.0)]);
        let stats = host.dispatch_pending();
        assert_eq!(stats.dropped, 2);
        assert_eq!(state.pointer, PointerPosition::new(5.0, 5.0));
    }

    #[test]
    fn headless_host_drops_everything() {
        let mut host = WebHost::with_capabilities(HostCapabilities::HEADLESS);
        let mounted = Narrative::new(SectionElement::canonical_document())
            .mount(&mut host)
            .expect("mount");
        host.push_pointer(1.0, 1.0);
        host.push_intersections(vec![SectionObservation::entering(StageId::Intent, 1.0)]);
        assert_eq!(host.dispatch_pending().dropped, 2);
        assert_eq!(mounted.read(), NarrativeState::default());
    }

    #[test]
    fn empty_stage_list_is_rejected() {
        let mut host = WebHost::new();
        let listener = Listener::new(|_: Vec<SectionObservation>| {});
        let result = host.observe_sections(&[], &ObserverOptions::default(), listener);
        assert!(matches!(result, Err(HostError::Rejected(_))));
    }
}
