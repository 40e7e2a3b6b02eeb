#![forbid(unsafe_code)]

//! Consumer contract and fan-out.
//!
//! Visual consumers implement [`NarrativeConsumer`] and never see the
//! viewport, the pointer source, or the stage observer. A [`ConsumerSet`]
//! attaches them to a [`NarrativeReader`] and renders each of them once per
//! distinct published state, all with the identical [`NarrativeFrame`].
//!
//! # Invariants
//!
//! 1. Every consumer receives the initial frame on attach.
//! 2. All consumers in one publish receive the same frame, in attach order.
//! 3. A publish whose state equals the last delivered state (for example a
//!    transaction that wrote and then reverted) renders nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use scrollstage_core::{ArtifactAnchor, PointerPosition, StageId, ThemeToken};
use tracing::{debug, info_span, warn};
use web_time::Instant;

use crate::narrative::{NarrativeFrame, NarrativeReader, NarrativeState};
use crate::reactive::ChangeSubscription;

/// A visual consumer of the narrative.
pub trait NarrativeConsumer {
    /// Render one frame.
    fn render(&mut self, frame: &NarrativeFrame);

    /// Name used in logs.
    fn name(&self) -> &'static str {
        "consumer"
    }
}

impl<C: NarrativeConsumer + ?Sized> NarrativeConsumer for Box<C> {
    fn render(&mut self, frame: &NarrativeFrame) {
        (**self).render(frame);
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<C: NarrativeConsumer> NarrativeConsumer for Rc<RefCell<C>> {
    fn render(&mut self, frame: &NarrativeFrame) {
        self.borrow_mut().render(frame);
    }

    fn name(&self) -> &'static str {
        self.borrow().name()
    }
}

struct Fanout {
    consumers: Vec<Box<dyn NarrativeConsumer>>,
    last: Option<NarrativeState>,
    publishes: u64,
}

impl Fanout {
    fn publish(&mut self, frame: &NarrativeFrame) {
        let state = frame.state();
        if self.last == Some(state) {
            debug!(revision = frame.revision, "publish skipped: state unchanged");
            return;
        }
        self.last = Some(state);
        self.publishes += 1;

        let consumers = self.consumers.len() as u64;
        let start = Instant::now();
        let _span = info_span!(
            "narrative.publish",
            consumers,
            revision = frame.revision,
            stage = %frame.stage,
        )
        .entered();
        for consumer in &mut self.consumers {
            consumer.render(frame);
        }
        debug!(
            consumers,
            duration_us = start.elapsed().as_micros() as u64,
            "frame published"
        );
    }
}

/// Consumers attached to one narrative store.
///
/// Dropping the set detaches every consumer.
pub struct ConsumerSet {
    fanout: Rc<RefCell<Fanout>>,
    _subscription: ChangeSubscription,
}

impl ConsumerSet {
    /// Attach `consumers` to `reader`, rendering the current frame
    /// immediately.
    #[must_use]
    pub fn attach(reader: &NarrativeReader, consumers: Vec<Box<dyn NarrativeConsumer>>) -> Self {
        let fanout = Rc::new(RefCell::new(Fanout {
            consumers,
            last: None,
            publishes: 0,
        }));
        fanout.borrow_mut().publish(&reader.frame());

        let sink = Rc::clone(&fanout);
        let subscription = reader.subscribe(move |frame| match sink.try_borrow_mut() {
            Ok(mut fanout) => fanout.publish(frame),
            Err(_) => warn!(revision = frame.revision, "frame dropped: consumer wrote during render"),
        });

        Self {
            fanout,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fanout.borrow().consumers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frames delivered so far, counting the initial one.
    #[must_use]
    pub fn publishes(&self) -> u64 {
        self.fanout.borrow().publishes
    }

    /// Consumer names in attach order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.fanout.borrow().consumers.iter().map(|c| c.name()).collect()
    }
}

impl fmt::Debug for ConsumerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerSet")
            .field("consumers", &self.names())
            .field("publishes", &self.publishes())
            .finish()
    }
}

/// Background engine binding: the page root class for the active theme.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundTheme {
    theme: ThemeToken,
    root_class: String,
    transitions: u64,
}

impl BackgroundTheme {
    #[must_use]
    pub fn new() -> Self {
        Self {
            theme: ThemeToken::DEFAULT,
            root_class: ThemeToken::DEFAULT.root_class(),
            transitions: 0,
        }
    }

    #[must_use]
    pub const fn theme(&self) -> ThemeToken {
        self.theme
    }

    /// Class list for the page root, e.g. `"capstone theme-intent"`.
    #[must_use]
    pub fn root_class(&self) -> &str {
        &self.root_class
    }

    /// Theme changes applied so far.
    #[must_use]
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl Default for BackgroundTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeConsumer for BackgroundTheme {
    fn render(&mut self, frame: &NarrativeFrame) {
        if frame.theme == self.theme {
            return;
        }
        self.theme = frame.theme;
        self.root_class = frame.theme.root_class();
        self.transitions += 1;
    }

    fn name(&self) -> &'static str {
        "background-theme"
    }
}

/// Persistent artifact binding: morph target, resting side and tilt.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactMorph {
    viewport: (f64, f64),
    target: StageId,
    anchor: ArtifactAnchor,
    pointer: PointerPosition,
    tilt: (f64, f64),
    morphs: u64,
}

impl ArtifactMorph {
    /// Artifact in a viewport of `width` x `height`, used to normalize tilt.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: (width, height),
            target: StageId::FIRST,
            anchor: StageId::FIRST.layout().artifact_anchor(),
            pointer: PointerPosition::ORIGIN,
            tilt: PointerPosition::ORIGIN.normalized_offset(width, height),
            morphs: 0,
        }
    }

    /// Stage the artifact is morphing toward.
    #[must_use]
    pub const fn target(&self) -> StageId {
        self.target
    }

    #[must_use]
    pub const fn anchor(&self) -> ArtifactAnchor {
        self.anchor
    }

    #[must_use]
    pub const fn pointer(&self) -> PointerPosition {
        self.pointer
    }

    /// Pointer offset from the viewport center, in `[-1, 1]` per axis while
    /// the pointer is inside the viewport.
    #[must_use]
    pub const fn tilt(&self) -> (f64, f64) {
        self.tilt
    }

    /// Morph target changes so far.
    #[must_use]
    pub const fn morphs(&self) -> u64 {
        self.morphs
    }

    /// Update the viewport size after a host resize.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        self.tilt = self.pointer.normalized_offset(width, height);
    }
}

impl NarrativeConsumer for ArtifactMorph {
    fn render(&mut self, frame: &NarrativeFrame) {
        if frame.stage != self.target {
            self.target = frame.stage;
            self.anchor = frame.layout.artifact_anchor();
            self.morphs += 1;
        }
        self.pointer = frame.pointer;
        self.tilt = frame.pointer.normalized_offset(self.viewport.0, self.viewport.1);
    }

    fn name(&self) -> &'static str {
        "artifact-morph"
    }
}
