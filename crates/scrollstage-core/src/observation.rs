#![forbid(unsafe_code)]

//! Section elements, visibility observations, and watcher options.
//!
//! A host intersection watcher reports, per observed section, how much of the
//! section lies inside the (margin-adjusted) viewport. These reports are
//! ephemeral: the stage observer consumes each batch immediately.

use core::fmt;
use core::str::FromStr;

use crate::geometry::ViewportRect;
use crate::stage::StageId;

/// Visibility fraction a section must reach before it is eligible.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// A section container present in the document at mount time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionElement {
    element_id: String,
}

impl SectionElement {
    #[must_use]
    pub fn new(element_id: impl Into<String>) -> Self {
        Self {
            element_id: element_id.into(),
        }
    }

    /// The element's id attribute.
    #[must_use]
    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// The stage this element renders, if it is a stage section at all.
    #[must_use]
    pub fn stage(&self) -> Option<StageId> {
        StageId::from_element_id(&self.element_id)
    }

    /// Canonical section list: one element per stage, in document order.
    #[must_use]
    pub fn canonical_document() -> Vec<SectionElement> {
        StageId::ALL
            .iter()
            .map(|stage| SectionElement::new(stage.element_id()))
            .collect()
    }
}

/// One per-section visibility report from an intersection watcher.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionObservation {
    pub id: StageId,
    /// Fraction of the section inside the effective viewport, in `[0, 1]`.
    pub intersection_ratio: f64,
    /// Whether the section is sufficiently visible (ratio at or above the
    /// configured threshold).
    pub is_intersecting: bool,
}

impl SectionObservation {
    #[must_use]
    pub const fn new(id: StageId, intersection_ratio: f64, is_intersecting: bool) -> Self {
        Self {
            id,
            intersection_ratio,
            is_intersecting,
        }
    }

    /// A section that just became sufficiently visible.
    #[must_use]
    pub const fn entering(id: StageId, intersection_ratio: f64) -> Self {
        Self::new(id, intersection_ratio, true)
    }

    /// A section that just dropped below the threshold.
    #[must_use]
    pub const fn leaving(id: StageId, intersection_ratio: f64) -> Self {
        Self::new(id, intersection_ratio, false)
    }
}

/// A single root-margin length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarginLength {
    Px(f64),
    /// Percentage of the root's extent along the same axis.
    Percent(f64),
}

impl MarginLength {
    /// Resolve against the root extent along the relevant axis.
    #[must_use]
    pub fn resolve(self, extent: f64) -> f64 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => extent * pct / 100.0,
        }
    }
}

impl fmt::Display for MarginLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Percent(v) => write!(f, "{v}%"),
        }
    }
}

impl FromStr for MarginLength {
    type Err = RootMarginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || RootMarginParseError::InvalidLength(s.to_owned());
        let finite = |num: &str| num.parse::<f64>().ok().filter(|v| v.is_finite());
        if let Some(num) = s.strip_suffix('%') {
            return finite(num).map(Self::Percent).ok_or_else(bad);
        }
        if let Some(num) = s.strip_suffix("px") {
            return finite(num).map(Self::Px).ok_or_else(bad);
        }
        // Unitless zero is the only unitless length CSS accepts.
        match s.parse::<f64>() {
            Ok(v) if v == 0.0 => Ok(Self::Px(0.0)),
            _ => Err(bad()),
        }
    }
}

/// Errors from parsing a CSS-style root margin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootMarginParseError {
    /// Zero or more than four components.
    WrongArity(usize),
    /// A component was not a `px`/`%` length.
    InvalidLength(String),
}

impl fmt::Display for RootMarginParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongArity(n) => write!(f, "root margin needs 1 to 4 lengths, got {n}"),
            Self::InvalidLength(s) => write!(f, "invalid root margin length: {s}"),
        }
    }
}

impl std::error::Error for RootMarginParseError {}

/// Grow (positive) or shrink (negative) the viewport before computing
/// visibility. Same shorthand rules as CSS `margin`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct RootMargin {
    pub top: MarginLength,
    pub right: MarginLength,
    pub bottom: MarginLength,
    pub left: MarginLength,
}

impl RootMargin {
    /// No adjustment.
    pub const ZERO: RootMargin = RootMargin {
        top: MarginLength::Px(0.0),
        right: MarginLength::Px(0.0),
        bottom: MarginLength::Px(0.0),
        left: MarginLength::Px(0.0),
    };

    /// Trim `pct` percent off the top and bottom of the viewport.
    #[must_use]
    pub const fn vertical_inset_percent(pct: f64) -> Self {
        Self {
            top: MarginLength::Percent(-pct),
            right: MarginLength::Px(0.0),
            bottom: MarginLength::Percent(-pct),
            left: MarginLength::Px(0.0),
        }
    }

    /// Apply to a root rectangle, yielding the effective viewport.
    #[must_use]
    pub fn apply(&self, root: &ViewportRect) -> ViewportRect {
        root.outset(
            self.top.resolve(root.height),
            self.right.resolve(root.width),
            self.bottom.resolve(root.height),
            self.left.resolve(root.width),
        )
    }

    /// CSS serialization, e.g. `-10% 0px -10% 0px`.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!("{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::vertical_inset_percent(10.0)
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl FromStr for RootMargin {
    type Err = RootMarginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(str::parse::<MarginLength>)
            .collect::<Result<Vec<_>, _>>()?;
        let [top, right, bottom, left] = match parts.as_slice() {
            [all] => [*all; 4],
            [v, h] => [*v, *h, *v, *h],
            [t, h, b] => [*t, *h, *b, *h],
            [t, r, b, l] => [*t, *r, *b, *l],
            other => return Err(RootMarginParseError::WrongArity(other.len())),
        };
        Ok(Self {
            top,
            right,
            bottom,
            left,
        })
    }
}

impl TryFrom<String> for RootMargin {
    type Error = RootMarginParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RootMargin> for String {
    fn from(value: RootMargin) -> Self {
        value.to_css()
    }
}

/// Configuration handed to a host intersection watcher.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObserverOptions {
    /// Minimum visible fraction for a section to count as intersecting.
    pub threshold: f64,
    pub root_margin: RootMargin,
}

impl ObserverOptions {
    /// Effective viewport for a root of the given rectangle.
    #[must_use]
    pub fn effective_root(&self, root: &ViewportRect) -> ViewportRect {
        self.root_margin.apply(root)
    }

    /// Whether a ratio satisfies the threshold.
    #[must_use]
    pub fn meets_threshold(&self, ratio: f64) -> bool {
        ratio > 0.0 && ratio >= self.threshold
    }
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            root_margin: RootMargin::default(),
        }
    }
}
