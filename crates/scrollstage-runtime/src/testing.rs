#![forbid(unsafe_code)]

//! In-memory host and recording consumer for tests and benches.
//!
//! [`ManualHost`] records every registration and lets a test emit pointer
//! moves and intersection batches synchronously. [`RecordingConsumer`] keeps
//! every frame it renders.

use std::cell::RefCell;
use std::rc::Rc;

use scrollstage_core::{
    HostCapabilities, ObserverOptions, PointerPosition, SectionObservation, StageId,
};

use crate::consumer::NarrativeConsumer;
use crate::host::{HostError, IntersectionSource, PointerSource};
use crate::narrative::NarrativeFrame;
use crate::subscription::{Listener, SubId, SubscriptionGuard};

#[derive(Default)]
struct Registry {
    next_id: SubId,
    pointer: Vec<(SubId, Listener<PointerPosition>)>,
    watchers: Vec<(SubId, Listener<Vec<SectionObservation>>)>,
    observed: Vec<StageId>,
    options: Option<ObserverOptions>,
}

impl Registry {
    fn allocate(&mut self) -> SubId {
        self.next_id += 1;
        self.next_id
    }
}

/// A host driven entirely by the test.
#[derive(Clone)]
pub struct ManualHost {
    capabilities: HostCapabilities,
    registry: Rc<RefCell<Registry>>,
}

impl ManualHost {
    /// Host with both pointer events and intersection watching.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(HostCapabilities::INTERACTIVE)
    }

    #[must_use]
    pub fn with_capabilities(capabilities: HostCapabilities) -> Self {
        Self {
            capabilities,
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    #[must_use]
    pub const fn capabilities(&self) -> HostCapabilities {
        self.capabilities
    }

    /// Emit a pointer move to every registered listener. Returns `true` if
    /// any listener accepted it.
    pub fn move_pointer(&self, x: f64, y: f64) -> bool {
        let listeners: Vec<_> = self
            .registry
            .borrow()
            .pointer
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        let position = PointerPosition::new(x, y);
        listeners
            .iter()
            .fold(false, |delivered, l| l.emit(position) || delivered)
    }

    /// Emit one intersection batch to every registered watcher. Returns
    /// `true` if any watcher accepted it.
    pub fn deliver(&self, batch: Vec<SectionObservation>) -> bool {
        let watchers: Vec<_> = self
            .registry
            .borrow()
            .watchers
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        watchers
            .iter()
            .fold(false, |delivered, l| l.emit(batch.clone()) || delivered)
    }

    /// Convenience: a batch in which each listed stage enters at full
    /// visibility, in the given order.
    pub fn enter(&self, stages: &[StageId]) -> bool {
        self.deliver(
            stages
                .iter()
                .map(|&id| SectionObservation::entering(id, 1.0))
                .collect(),
        )
    }

    /// Stages passed to the most recent `observe_sections` call.
    #[must_use]
    pub fn observed_stages(&self) -> Vec<StageId> {
        self.registry.borrow().observed.clone()
    }

    /// Options passed to the most recent `observe_sections` call.
    #[must_use]
    pub fn observer_options(&self) -> Option<ObserverOptions> {
        self.registry.borrow().options
    }

    #[must_use]
    pub fn live_pointer_listeners(&self) -> usize {
        self.registry
            .borrow()
            .pointer
            .iter()
            .filter(|(_, l)| !l.is_stopped())
            .count()
    }

    #[must_use]
    pub fn live_watchers(&self) -> usize {
        self.registry
            .borrow()
            .watchers
            .iter()
            .filter(|(_, l)| !l.is_stopped())
            .count()
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ManualHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualHost")
            .field("capabilities", &self.capabilities)
            .field("pointer_listeners", &self.live_pointer_listeners())
            .field("watchers", &self.live_watchers())
            .finish()
    }
}

impl PointerSource for ManualHost {
    fn subscribe_pointer(
        &mut self,
        listener: Listener<PointerPosition>,
    ) -> Result<SubscriptionGuard, HostError> {
        if !self.capabilities.contains(HostCapabilities::POINTER_EVENTS) {
            return Err(HostError::Unavailable("pointer events"));
        }
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.allocate();
            registry.pointer.push((id, listener.clone()));
            id
        };
        let registry = Rc::clone(&self.registry);
        Ok(SubscriptionGuard::new(
            id,
            "pointer",
            &listener,
            Some(Box::new(move || {
                registry.borrow_mut().pointer.retain(|(sub, _)| *sub != id);
            })),
        ))
    }
}

impl IntersectionSource for ManualHost {
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
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.allocate();
            registry.watchers.push((id, listener.clone()));
            registry.observed = stages.to_vec();
            registry.options = Some(*options);
            id
        };
        let registry = Rc::clone(&self.registry);
        Ok(SubscriptionGuard::new(
            id,
            "intersections",
            &listener,
            Some(Box::new(move || {
                registry.borrow_mut().watchers.retain(|(sub, _)| *sub != id);
            })),
        ))
    }
}

/// Consumer that keeps every frame it is given.
#[derive(Debug, Default, Clone)]
pub struct RecordingConsumer {
    frames: Vec<NarrativeFrame>,
}

impl RecordingConsumer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder shared between the consumer set and the test.
    #[must_use]
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    #[must_use]
    pub fn frames(&self) -> &[NarrativeFrame] {
        &self.frames
    }

    #[must_use]
    pub fn last(&self) -> Option<&NarrativeFrame> {
        self.frames.last()
    }

    /// Active stage of each frame, in render order.
    #[must_use]
    pub fn stages(&self) -> Vec<StageId> {
        self.frames.iter().map(|f| f.stage).collect()
    }

    /// Stage sequence with consecutive repeats collapsed.
    #[must_use]
    pub fn stage_changes(&self) -> Vec<StageId> {
        let mut stages = self.stages();
        stages.dedup();
        stages
    }
}

impl NarrativeConsumer for RecordingConsumer {
    fn render(&mut self, frame: &NarrativeFrame) {
        self.frames.push(*frame);
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_host_rejects_missing_capabilities() {
        let mut host = ManualHost::with_capabilities(HostCapabilities::HEADLESS);
        let listener = Listener::new(|_: PointerPosition| {});
        assert_eq!(
            host.subscribe_pointer(listener).err(),
            Some(HostError::Unavailable("pointer events"))
        );
    }

    #[test]
    fn guard_drop_removes_registration() {
        let mut host = ManualHost::new();
        let guard = host
            .subscribe_pointer(Listener::new(|_: PointerPosition| {}))
            .expect("pointer events available");
        assert_eq!(host.live_pointer_listeners(), 1);
        drop(guard);
        assert_eq!(host.live_pointer_listeners(), 0);
        assert!(!host.move_pointer(1.0, 1.0));
    }

    #[test]
    fn recorder_collapses_repeats() {
        let mut recorder = RecordingConsumer::new();
        for (stage, revision) in [(StageId::Hero, 0), (StageId::Hero, 1), (StageId::Origins, 2)] {
            recorder.render(&NarrativeFrame::from_state(
                crate::narrative::NarrativeState {
                    active_stage: stage,
                    pointer: PointerPosition::ORIGIN,
                },
                revision,
            ));
        }
        assert_eq!(recorder.stage_changes(), vec![StageId::Hero, StageId::Origins]);
        assert_eq!(recorder.last().map(|f| f.revision), Some(2));
    }
}
