#![forbid(unsafe_code)]

//! Host environment seams.
//!
//! The runtime never touches a document or an event loop directly. A host
//! (a browser binding, the deterministic `scrollstage-web` backend, or the
//! [`ManualHost`](crate::testing::ManualHost) used in tests) implements these
//! traits and delivers events through the [`Listener`]s it is handed.

use core::fmt;

use scrollstage_core::{ObserverOptions, PointerPosition, SectionObservation, StageId};

use crate::subscription::{Listener, SubscriptionGuard};

/// Host-side failures. None of these are ever surfaced to consumers; the
/// affected component degrades to its last known state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host lacks the named event mechanism.
    Unavailable(&'static str),
    /// The host refused the registration.
    Rejected(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(what) => write!(f, "host capability unavailable: {what}"),
            Self::Rejected(msg) => write!(f, "host rejected subscription: {msg}"),
        }
    }
}

impl std::error::Error for HostError {}

/// Source of viewport-wide pointer-move events.
pub trait PointerSource {
    /// Start delivering pointer positions to `listener`.
    ///
    /// The returned guard unsubscribes when dropped.
    fn subscribe_pointer(
        &mut self,
        listener: Listener<PointerPosition>,
    ) -> Result<SubscriptionGuard, HostError>;
}

/// Source of section visibility batches.
pub trait IntersectionSource {
    /// Watch the sections rendering `stages` and deliver each batch of
    /// visibility changes to `listener`, in watcher delivery order.
    ///
    /// The returned guard unregisters every watched section when dropped.
    fn observe_sections(
        &mut self,
        stages: &[StageId],
        options: &ObserverOptions,
        listener: Listener<Vec<SectionObservation>>,
    ) -> Result<SubscriptionGuard, HostError>;
}

/// A host providing both event streams.
pub trait NarrativeHost: PointerSource + IntersectionSource {}

impl<T: PointerSource + IntersectionSource> NarrativeHost for T {}
