#![forbid(unsafe_code)]

//! Narrative state: the single source of truth for `(stage, pointer)`.
//!
//! The pointer tracker and the stage observer hold [`NarrativeWriter`]s;
//! consumers hold [`NarrativeReader`]s. Both are handles onto one
//! [`NarrativeStore`], backed by an [`Observable`], so every distinct change
//! publishes once and writes of an unchanged value publish nothing.
//!
//! # Invariants
//!
//! 1. `active_stage` is always a member of the stage enumeration.
//! 2. `revision` increases by exactly one per distinct change.
//! 3. A [`NarrativeStore::transaction`] publishes at most once, after its
//!    closure returns.

use scrollstage_core::{PointerPosition, StageId, StageLayout, ThemeToken};

use crate::reactive::{BatchScope, ChangeSubscription, Observable};

/// The combined `(stage, pointer)` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NarrativeState {
    pub active_stage: StageId,
    pub pointer: PointerPosition,
}

impl NarrativeState {
    /// Theme for the active stage.
    #[must_use]
    pub const fn theme(&self) -> ThemeToken {
        self.active_stage.theme()
    }
}

/// What consumers render from: a state snapshot plus derived presentation
/// keys and the store revision that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrativeFrame {
    pub stage: StageId,
    pub theme: ThemeToken,
    pub layout: StageLayout,
    pub pointer: PointerPosition,
    pub revision: u64,
}

impl NarrativeFrame {
    #[must_use]
    pub const fn from_state(state: NarrativeState, revision: u64) -> Self {
        Self {
            stage: state.active_stage,
            theme: state.active_stage.theme(),
            layout: state.active_stage.layout(),
            pointer: state.pointer,
            revision,
        }
    }

    /// The state this frame was built from.
    #[must_use]
    pub const fn state(&self) -> NarrativeState {
        NarrativeState {
            active_stage: self.stage,
            pointer: self.pointer,
        }
    }
}

/// Owner of the narrative state.
#[derive(Debug, Clone)]
pub struct NarrativeStore {
    state: Observable<NarrativeState>,
}

impl NarrativeStore {
    /// Store at `hero` and `(0, 0)`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(NarrativeState::default())
    }

    #[must_use]
    pub fn with_state(state: NarrativeState) -> Self {
        Self {
            state: Observable::new(state),
        }
    }

    /// Latest state.
    #[must_use]
    pub fn read(&self) -> NarrativeState {
        self.state.get()
    }

    /// Latest state as a frame.
    #[must_use]
    pub fn frame(&self) -> NarrativeFrame {
        NarrativeFrame::from_state(self.state.get(), self.state.version())
    }

    /// Number of distinct changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.version()
    }

    #[must_use]
    pub fn reader(&self) -> NarrativeReader {
        NarrativeReader {
            state: self.state.clone(),
        }
    }

    #[must_use]
    pub fn writer(&self) -> NarrativeWriter {
        NarrativeWriter {
            state: self.state.clone(),
        }
    }

    /// Run `f` with a writer, publishing at most once when it returns.
    ///
    /// Nested transactions publish when the outermost one ends.
    pub fn transaction<R>(&self, f: impl FnOnce(&NarrativeWriter) -> R) -> R {
        self.writer().transaction(f)
    }
}

impl Default for NarrativeStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write handle held by the pointer tracker and the stage observer.
#[derive(Debug, Clone)]
pub struct NarrativeWriter {
    state: Observable<NarrativeState>,
}

impl NarrativeWriter {
    /// Set the active stage. Returns `true` if it changed.
    pub fn set_stage(&self, stage: StageId) -> bool {
        self.state.update(|state| state.active_stage = stage)
    }

    /// Set the pointer. Returns `true` if it changed.
    pub fn set_pointer(&self, pointer: PointerPosition) -> bool {
        self.state.update(|state| state.pointer = pointer)
    }

    #[must_use]
    pub fn read(&self) -> NarrativeState {
        self.state.get()
    }

    /// Run `f` with this writer, publishing at most once when it returns.
    pub fn transaction<R>(&self, f: impl FnOnce(&NarrativeWriter) -> R) -> R {
        let _scope = BatchScope::new();
        f(self)
    }
}

/// Read-only handle given to consumers.
#[derive(Debug, Clone)]
pub struct NarrativeReader {
    state: Observable<NarrativeState>,
}

impl NarrativeReader {
    #[must_use]
    pub fn read(&self) -> NarrativeState {
        self.state.get()
    }

    #[must_use]
    pub fn frame(&self) -> NarrativeFrame {
        NarrativeFrame::from_state(self.state.get(), self.state.version())
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.state.version()
    }

    /// Call `f` with a fresh frame after every published change.
    pub fn subscribe(&self, f: impl Fn(&NarrativeFrame) + 'static) -> ChangeSubscription {
        let source = self.state.clone();
        self.state.subscribe(move |state| {
            let frame = NarrativeFrame::from_state(*state, source.version());
            f(&frame);
        })
    }
}
