#![forbid(unsafe_code)]

//! Reactive primitives backing the narrative store.
//!
//! - [`Observable`]: shared value, version counter, change callbacks.
//! - [`BatchScope`]: defers callbacks so one logical update publishes once.

pub mod batch;
pub mod observable;

pub use batch::BatchScope;
pub use observable::{ChangeSubscription, Observable};
