#![forbid(unsafe_code)]

//! JSON parser for encoded host events.
//!
//! Embedders that cannot hand Rust values across their boundary (a worker,
//! a replay log, a JS shim) encode events as JSON:
//!
//! ```json
//! {"kind":"pointer","x":320,"y":140}
//! {"kind":"intersection","entries":[{"id":"intent","ratio":0.7,"intersecting":true}]}
//! ```
//!
//! [`parse_encoded_host_event`] turns one such string into a [`HostEvent`].
//! Kinds with no host mapping return `Ok(None)`. Entries naming a section
//! id outside the stage registry are dropped. When `intersecting` is
//! omitted it is derived from the ratio and the default threshold.

use scrollstage_core::{HostEvent, ObserverOptions, PointerPosition, SectionObservation, StageId};
use serde::Deserialize;

/// Errors from parsing encoded host event JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    /// Malformed JSON.
    Json(String),
    /// Missing required field.
    MissingField(&'static str),
}

impl core::fmt::Display for InputParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "JSON parse error: {msg}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
        }
    }
}

impl std::error::Error for InputParseError {}

#[derive(Debug, Deserialize)]
struct RawEvent {
    kind: String,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    entries: Option<Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: String,
    #[serde(default)]
    ratio: Option<f64>,
    #[serde(default)]
    intersecting: Option<bool>,
}

/// Parse one JSON-encoded host event.
///
/// Returns `Err` for malformed JSON or a missing required field.
pub fn parse_encoded_host_event(json: &str) -> Result<Option<HostEvent>, InputParseError> {
    let raw: RawEvent =
        serde_json::from_str(json).map_err(|e| InputParseError::Json(e.to_string()))?;

    match raw.kind.as_str() {
        "pointer" | "pointermove" | "mousemove" => parse_pointer(&raw).map(Some),
        "intersection" => parse_intersection(raw).map(Some),
        _ => Ok(None),
    }
}

fn parse_pointer(raw: &RawEvent) -> Result<HostEvent, InputParseError> {
    let x = raw.x.ok_or(InputParseError::MissingField("x"))?;
    let y = raw.y.ok_or(InputParseError::MissingField("y"))?;
    Ok(HostEvent::PointerMove(PointerPosition::new(x, y)))
}

fn parse_intersection(raw: RawEvent) -> Result<HostEvent, InputParseError> {
    let entries = raw.entries.ok_or(InputParseError::MissingField("entries"))?;
    let defaults = ObserverOptions::default();
    let mut batch = Vec::with_capacity(entries.len());
    for entry in entries {
        let ratio = entry
            .ratio
            .ok_or(InputParseError::MissingField("ratio"))?
            .clamp(0.0, 1.0);
        let Some(id) = StageId::from_element_id(&entry.id) else {
            continue;
        };
        let intersecting = entry
            .intersecting
            .unwrap_or_else(|| defaults.meets_threshold(ratio));
        batch.push(SectionObservation::new(id, ratio, intersecting));
    }
    Ok(HostEvent::Intersections(batch))
}
