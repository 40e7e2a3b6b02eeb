#![forbid(unsafe_code)]

//! Scrollstage Runtime
//!
//! The viewport-driven narrative state machine: which stage is active, where
//! the pointer is, and who gets told.
//!
//! # Key Components
//!
//! - [`PointerTracker`] - Republishes raw pointer coordinates
//! - [`StageObserver`] - Picks the active stage from intersection batches
//! - [`StageMachine`] / [`TieBreak`] - The transition rule and tie policy
//! - [`NarrativeStore`] - Single source of truth for `(stage, pointer)`
//! - [`NarrativeConsumer`] / [`ConsumerSet`] - The consumer contract and fan-out
//! - [`Narrative`] / [`MountedNarrative`] - Mount and unmount lifecycle
//! - [`NarrativeConfig`] - Observer tuning and tie-break policy as data
//!
//! # Role in scrollstage
//! `scrollstage-runtime` sits between a host (which owns the real pointer
//! and intersection sources) and visual consumers (which only ever see
//! [`NarrativeFrame`]s). Hosts implement [`PointerSource`] and
//! [`IntersectionSource`]; everything is single-threaded and driven by the
//! host's event loop.

pub mod config;
pub mod consumer;
pub mod host;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod mount;
pub mod narrative;
pub mod pointer_tracker;
pub mod reactive;
pub mod stage_observer;
pub mod subscription;
pub mod testing;

pub use config::{ConfigError, NarrativeConfig};
pub use consumer::{ArtifactMorph, BackgroundTheme, ConsumerSet, NarrativeConsumer};
pub use host::{HostError, IntersectionSource, NarrativeHost, PointerSource};
pub use mount::{MountedNarrative, Narrative};
pub use narrative::{NarrativeFrame, NarrativeReader, NarrativeState, NarrativeStore, NarrativeWriter};
pub use pointer_tracker::{MountedTracker, PointerTracker};
pub use stage_observer::{MountedObserver, StageMachine, StageObserver, TieBreak, Transition};
pub use subscription::{Listener, SubId, SubscriptionGuard};
