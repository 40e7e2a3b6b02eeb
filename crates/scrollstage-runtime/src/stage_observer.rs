#![forbid(unsafe_code)]

//! Stage observer: decides the single active stage from visibility batches.
//!
//! # Design
//!
//! The decision logic is a deterministic automaton over [`StageId`] with one
//! transition rule: a sufficiently visible section makes its stage active.
//! [`StageMachine`] holds that rule plus a named [`TieBreak`] policy for
//! batches in which several sections report at once. [`StageObserver`]
//! wires the machine to a host intersection watcher and to the narrative
//! store.
//!
//! # Invariants
//!
//! 1. The active stage is always a member of the closed enumeration.
//! 2. Before any batch, the active stage is [`StageId::FIRST`].
//! 3. A batch with no intersecting observation leaves the stage unchanged.
//! 4. No transition is rejected, debounced, or delayed.

use std::cell::RefCell;
use std::rc::Rc;

use scrollstage_core::{ObserverOptions, SectionElement, SectionObservation, StageId};
use tracing::{debug, warn};

use crate::config::NarrativeConfig;
use crate::host::IntersectionSource;
use crate::narrative::NarrativeWriter;
use crate::subscription::{Listener, SubscriptionGuard};

/// Policy for picking one stage when several sections intersect in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "kebab-case"))]
pub enum TieBreak {
    /// The last intersecting observation in delivery order wins.
    #[default]
    LastReported,
    /// The intersecting observation with the highest ratio wins; on equal
    /// ratios the later one wins.
    MostVisible,
}

impl TieBreak {
    /// Pick the winning stage of a batch, or `None` if nothing intersects.
    #[must_use]
    pub fn resolve(self, batch: &[SectionObservation]) -> Option<StageId> {
        let intersecting = batch.iter().filter(|obs| obs.is_intersecting);
        match self {
            Self::LastReported => intersecting.last().map(|obs| obs.id),
            Self::MostVisible => intersecting
                .fold(None::<&SectionObservation>, |best, obs| match best {
                    Some(b) if b.intersection_ratio > obs.intersection_ratio => Some(b),
                    _ => Some(obs),
                })
                .map(|obs| obs.id),
        }
    }
}

/// Outcome of applying one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The active stage did not change.
    Stay(StageId),
    /// The active stage moved.
    Moved { from: StageId, to: StageId },
}

impl Transition {
    /// Active stage after the transition.
    #[must_use]
    pub const fn stage(self) -> StageId {
        match self {
            Self::Stay(stage) | Self::Moved { to: stage, .. } => stage,
        }
    }
}

/// The active-stage automaton.
#[derive(Debug, Clone)]
pub struct StageMachine {
    active: StageId,
    tie_break: TieBreak,
    transitions: u64,
}

impl StageMachine {
    /// Machine at the first stage in document order.
    #[must_use]
    pub const fn new(tie_break: TieBreak) -> Self {
        Self::starting_at(StageId::FIRST, tie_break)
    }

    #[must_use]
    pub const fn starting_at(active: StageId, tie_break: TieBreak) -> Self {
        Self {
            active,
            tie_break,
            transitions: 0,
        }
    }

    #[must_use]
    pub const fn active(&self) -> StageId {
        self.active
    }

    #[must_use]
    pub const fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Number of `Moved` transitions taken so far.
    #[must_use]
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Apply one batch of observations.
    pub fn apply(&mut self, batch: &[SectionObservation]) -> Transition {
        match self.tie_break.resolve(batch) {
            Some(to) if to != self.active => {
                let from = std::mem::replace(&mut self.active, to);
                self.transitions += 1;
                Transition::Moved { from, to }
            }
            _ => Transition::Stay(self.active),
        }
    }
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new(TieBreak::default())
    }
}

/// Watches an explicit set of section elements and drives the active stage.
#[derive(Debug, Clone)]
pub struct StageObserver {
    stages: Vec<StageId>,
    options: ObserverOptions,
    tie_break: TieBreak,
}

impl StageObserver {
    /// Build an observer for `sections`.
    ///
    /// Elements whose id is not a stage are skipped; an element repeated for
    /// the same stage is registered once.
    #[must_use]
    pub fn new(sections: &[SectionElement], config: &NarrativeConfig) -> Self {
        let mut stages = Vec::with_capacity(sections.len());
        for section in sections {
            match section.stage() {
                Some(stage) if !stages.contains(&stage) => stages.push(stage),
                Some(stage) => debug!(%stage, "duplicate section ignored"),
                None => debug!(element_id = section.element_id(), "non-stage section ignored"),
            }
        }
        Self {
            stages,
            options: config.observer,
            tie_break: config.tie_break,
        }
    }

    /// Stages that will be registered with the host, in the order given.
    #[must_use]
    pub fn registered_stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Register with `host` and start driving `writer`.
    ///
    /// If the host cannot watch intersections, the observer stays idle and
    /// the active stage remains at its initial value.
    pub fn mount(self, host: &mut impl IntersectionSource, writer: NarrativeWriter) -> MountedObserver {
        let initial = writer.read().active_stage;
        let machine = Rc::new(RefCell::new(StageMachine::starting_at(initial, self.tie_break)));

        if self.stages.is_empty() {
            debug!("no stage sections to observe");
            return MountedObserver {
                guard: None,
                machine,
                stages: self.stages,
            };
        }

        let registered = self.stages.clone();
        let batch_machine = Rc::clone(&machine);
        let listener = Listener::new(move |batch: Vec<SectionObservation>| {
            let relevant: Vec<SectionObservation> = batch
                .into_iter()
                .filter(|obs| registered.contains(&obs.id))
                .collect();
            // The whole batch is one update: consumers see at most one frame.
            writer.transaction(|w| {
                let transition = batch_machine.borrow_mut().apply(&relevant);
                if let Transition::Moved { from, to } = transition {
                    debug!(%from, %to, batch_len = relevant.len(), "active stage moved");
                    w.set_stage(to);
                }
            });
        });

        let guard = match host.observe_sections(&self.stages, &self.options, listener) {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(error = %err, "intersection watching unavailable; stage stays at initial value");
                None
            }
        };

        MountedObserver {
            guard,
            machine,
            stages: self.stages,
        }
    }
}

/// A mounted observer. Dropping it unregisters every watched section.
#[derive(Debug)]
pub struct MountedObserver {
    guard: Option<SubscriptionGuard>,
    machine: Rc<RefCell<StageMachine>>,
    stages: Vec<StageId>,
}

impl MountedObserver {
    /// Whether a host watcher is currently registered.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.guard.is_some()
    }

    /// Active stage according to the machine.
    #[must_use]
    pub fn active(&self) -> StageId {
        self.machine.borrow().active()
    }

    /// Transitions taken since mount.
    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.machine.borrow().transitions()
    }

    #[must_use]
    pub fn stages(&self) -> &[StageId] {
        &self.stages
    }

    /// Unregister now. Equivalent to dropping.
    pub fn unmount(mut self) {
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::narrative::NarrativeStore;
    use crate::testing::ManualHost;
    use scrollstage_core::HostCapabilities;

    fn enter(id: StageId, ratio: f64) -> SectionObservation {
        SectionObservation::entering(id, ratio)
    }

    fn leave(id: StageId, ratio: f64) -> SectionObservation {
        SectionObservation::leaving(id, ratio)
    }

    #[test]
    fn machine_starts_at_first_stage() {
        let machine = StageMachine::default();
        assert_eq!(machine.active(), StageId::Hero);
        assert_eq!(machine.transitions(), 0);
    }

    #[test]
    fn last_reported_wins_within_batch() {
        let mut machine = StageMachine::new(TieBreak::LastReported);
        let t = machine.apply(&[enter(StageId::Feedback, 0.9), enter(StageId::Intent, 0.55)]);
        assert_eq!(
            t,
            Transition::Moved {
                from: StageId::Hero,
                to: StageId::Intent
            }
        );
    }

    #[test]
    fn most_visible_wins_within_batch() {
        let mut machine = StageMachine::new(TieBreak::MostVisible);
        let t = machine.apply(&[enter(StageId::Feedback, 0.9), enter(StageId::Intent, 0.55)]);
        assert_eq!(t.stage(), StageId::Feedback);
    }

    #[test]
    fn most_visible_equal_ratio_prefers_later() {
        let winner = TieBreak::MostVisible.resolve(&[
            enter(StageId::Origins, 0.6),
            enter(StageId::Feedback, 0.6),
        ]);
        assert_eq!(winner, Some(StageId::Feedback));
    }

    #[test]
    fn non_intersecting_observations_are_ignored() {
        let mut machine = StageMachine::new(TieBreak::LastReported);
        machine.apply(&[enter(StageId::Origins, 0.7)]);
        let t = machine.apply(&[enter(StageId::Feedback, 0.6), leave(StageId::Origins, 0.3)]);
        assert_eq!(t.stage(), StageId::Feedback);
    }

    #[test]
    fn empty_or_all_leaving_batch_keeps_stage() {
        let mut machine = StageMachine::new(TieBreak::LastReported);
        machine.apply(&[enter(StageId::Origins, 0.7)]);
        assert_eq!(machine.apply(&[]), Transition::Stay(StageId::Origins));
        assert_eq!(
            machine.apply(&[leave(StageId::Origins, 0.2)]),
            Transition::Stay(StageId::Origins)
        );
        assert_eq!(machine.transitions(), 1);
    }

    #[test]
    fn re_entering_active_stage_is_stay() {
        let mut machine = StageMachine::new(TieBreak::LastReported);
        assert_eq!(
            machine.apply(&[enter(StageId::Hero, 1.0)]),
            Transition::Stay(StageId::Hero)
        );
    }

    #[test]
    fn observer_skips_unknown_and_duplicate_sections() {
        let sections = vec![
            SectionElement::new("hero"),
            SectionElement::new("site-nav"),
            SectionElement::new("intent"),
            SectionElement::new("hero"),
        ];
        let observer = StageObserver::new(&sections, &NarrativeConfig::default());
        assert_eq!(observer.registered_stages(), &[StageId::Hero, StageId::Intent]);
    }

    #[test]
    fn mounted_observer_registers_with_configured_options() {
        let mut host = ManualHost::new();
        let store = NarrativeStore::new();
        let observer = StageObserver::new(
            &SectionElement::canonical_document(),
            &NarrativeConfig::default(),
        );
        let mounted = observer.mount(&mut host, store.writer());
        assert!(mounted.is_live());
        assert_eq!(host.observed_stages(), StageId::ALL.to_vec());
        assert_eq!(host.observer_options(), Some(ObserverOptions::default()));
    }

    #[test]
    fn observations_for_unregistered_stages_are_ignored() {
        let mut host = ManualHost::new();
        let store = NarrativeStore::new();
        let observer = StageObserver::new(
            &[SectionElement::new("hero"), SectionElement::new("origins")],
            &NarrativeConfig::default(),
        );
        let _mounted = observer.mount(&mut host, store.writer());
        host.deliver(vec![enter(StageId::Footer, 1.0)]);
        assert_eq!(store.read().active_stage, StageId::Hero);
        host.deliver(vec![enter(StageId::Origins, 0.8)]);
        assert_eq!(store.read().active_stage, StageId::Origins);
    }

    #[test]
    fn batch_publishes_one_frame_after_the_machine_settles() {
        use crate::consumer::ConsumerSet;
        use crate::testing::RecordingConsumer;

        let mut host = ManualHost::new();
        let store = NarrativeStore::new();
        let recorder = RecordingConsumer::shared();
        let _set = ConsumerSet::attach(&store.reader(), vec![Box::new(Rc::clone(&recorder))]);
        let mounted = StageObserver::new(
            &SectionElement::canonical_document(),
            &NarrativeConfig::default(),
        )
        .mount(&mut host, store.writer());

        host.deliver(vec![
            enter(StageId::Origins, 0.9),
            leave(StageId::Hero, 0.2),
            enter(StageId::Feedback, 0.6),
        ]);
        assert_eq!(recorder.borrow().stages(), vec![StageId::Hero, StageId::Feedback]);
        // The machine is settled by the time consumers render.
        assert_eq!(mounted.active(), StageId::Feedback);
        assert!(!crate::reactive::batch::is_batching());
    }

    #[test]
    fn unavailable_host_leaves_initial_stage() {
        let mut host = ManualHost::with_capabilities(HostCapabilities::POINTER_EVENTS);
        let store = NarrativeStore::new();
        let observer = StageObserver::new(
            &SectionElement::canonical_document(),
            &NarrativeConfig::default(),
        );
        let mounted = observer.mount(&mut host, store.writer());
        assert!(!mounted.is_live());
        assert!(!host.deliver(vec![enter(StageId::Intent, 1.0)]));
        assert_eq!(store.read().active_stage, StageId::Hero);
    }

    #[test]
    fn unmount_stops_stage_updates() {
        let mut host = ManualHost::new();
        let store = NarrativeStore::new();
        let mounted = StageObserver::new(
            &SectionElement::canonical_document(),
            &NarrativeConfig::default(),
        )
        .mount(&mut host, store.writer());
        host.deliver(vec![enter(StageId::Origins, 0.8)]);
        mounted.unmount();
        assert!(!host.deliver(vec![enter(StageId::Footer, 1.0)]));
        assert_eq!(store.read().active_stage, StageId::Origins);
        assert_eq!(host.live_watchers(), 0);
    }
}
