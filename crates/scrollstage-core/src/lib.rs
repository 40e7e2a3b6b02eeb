#![forbid(unsafe_code)]

//! Core: canonical types for scroll-narrated pages.
//!
//! # Role in scrollstage
//! `scrollstage-core` is the vocabulary layer. It owns the closed stage
//! registry, pointer coordinates, per-section visibility observations, and
//! the viewport geometry used to derive them. It performs no I/O.
//!
//! # Primary responsibilities
//! - **StageId / ThemeToken**: the ordered stage enumeration and its total
//!   theme mapping.
//! - **PointerPosition**: raw viewport-relative pointer coordinates.
//! - **SectionObservation / ObserverOptions**: what an intersection watcher
//!   reports and how it is configured (threshold, root margin).
//! - **Geometry**: viewport rectangles, root-margin insets, visibility ratios.
//! - **HostEvent / HostCapabilities**: what a host environment can deliver.
//!
//! # How it fits in the system
//! The runtime (`scrollstage-runtime`) consumes these types to drive the
//! narrative state machine. Hosts (`scrollstage-web`) produce them.

pub mod event;
pub mod geometry;
pub mod observation;
pub mod pointer;
pub mod stage;

pub use event::{HostCapabilities, HostEvent};
pub use geometry::ViewportRect;
pub use observation::{
    DEFAULT_THRESHOLD, MarginLength, ObserverOptions, RootMargin, RootMarginParseError,
    SectionElement, SectionObservation,
};
pub use pointer::PointerPosition;
pub use stage::{
    ArtifactAnchor, StageId, StageLayout, ThemeToken, UnknownStage, all_stages, layout_for,
    theme_for, theme_for_element_id,
};
