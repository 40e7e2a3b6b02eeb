#![forbid(unsafe_code)]

//! The stage registry.
//!
//! Stages are the named phases of the scroll narrative, one per content
//! section. The set is closed and ordered: order is document order and is
//! only ever used to pick the initial stage, never to compute progress.
//!
//! # Invariants
//!
//! 1. [`StageId::ALL`] lists every variant exactly once, in document order.
//! 2. [`theme_for`] is total and pure.
//! 3. [`StageId::from_element_id`] accepts exactly the canonical element ids
//!    (plus the variant name `fluidity`) and nothing else.

use core::fmt;
use core::str::FromStr;

/// One named phase of the scroll narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum StageId {
    /// Opening title section. The page always opens here.
    #[default]
    Hero,
    Origins,
    Feedback,
    Intent,
    /// Rendered in the document as the `non-blocking` section.
    #[cfg_attr(feature = "serde", serde(rename = "non-blocking", alias = "fluidity"))]
    Fluidity,
    Probabilistic,
    Environment,
    Footer,
}

impl StageId {
    /// Every stage in document order.
    pub const ALL: [StageId; 8] = [
        StageId::Hero,
        StageId::Origins,
        StageId::Feedback,
        StageId::Intent,
        StageId::Fluidity,
        StageId::Probabilistic,
        StageId::Environment,
        StageId::Footer,
    ];

    /// The first stage in document order.
    pub const FIRST: StageId = StageId::Hero;

    /// Position of this stage in document order.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The section element id this stage is rendered under.
    #[must_use]
    pub const fn element_id(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::Origins => "origins",
            Self::Feedback => "feedback",
            Self::Intent => "intent",
            Self::Fluidity => "non-blocking",
            Self::Probabilistic => "probabilistic",
            Self::Environment => "environment",
            Self::Footer => "footer",
        }
    }

    /// Map a section element id back to its stage.
    ///
    /// Returns `None` for ids outside the registry; such elements are not
    /// stages and are expected to be ignored by callers.
    #[must_use]
    pub fn from_element_id(id: &str) -> Option<Self> {
        match id {
            "hero" => Some(Self::Hero),
            "origins" => Some(Self::Origins),
            "feedback" => Some(Self::Feedback),
            "intent" => Some(Self::Intent),
            "non-blocking" | "fluidity" => Some(Self::Fluidity),
            "probabilistic" => Some(Self::Probabilistic),
            "environment" => Some(Self::Environment),
            "footer" => Some(Self::Footer),
            _ => None,
        }
    }

    /// Theme token for this stage.
    #[must_use]
    pub const fn theme(self) -> ThemeToken {
        match self {
            Self::Hero => ThemeToken("theme-hero"),
            Self::Origins => ThemeToken("theme-origins"),
            Self::Feedback => ThemeToken("theme-feedback"),
            Self::Intent => ThemeToken("theme-intent"),
            Self::Fluidity => ThemeToken("theme-fluid"),
            Self::Probabilistic => ThemeToken("theme-probabilistic"),
            Self::Environment => ThemeToken("theme-environment"),
            Self::Footer => ThemeToken("theme-footer"),
        }
    }

    /// Placement of the section copy for this stage.
    #[must_use]
    pub const fn layout(self) -> StageLayout {
        match self {
            Self::Hero | Self::Environment | Self::Footer => StageLayout::Centered,
            Self::Origins | Self::Intent | Self::Probabilistic => StageLayout::TextLeft,
            Self::Feedback | Self::Fluidity => StageLayout::TextRight,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_id())
    }
}

/// Error returned when parsing a string that names no stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStage(pub String);

impl fmt::Display for UnknownStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown stage id: {}", self.0)
    }
}

impl std::error::Error for UnknownStage {}

impl FromStr for StageId {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_element_id(s).ok_or_else(|| UnknownStage(s.to_owned()))
    }
}

/// Opaque presentation key selecting the palette/background for a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThemeToken(&'static str);

impl ThemeToken {
    /// Token used when no stage mapping applies.
    pub const DEFAULT: ThemeToken = ThemeToken("theme-hero");

    /// The token as a class name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Class list for the page root carrying this theme.
    #[must_use]
    pub fn root_class(&self) -> String {
        format!("capstone {}", self.0)
    }
}

impl Default for ThemeToken {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ThemeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// How a stage's copy is placed inside its section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageLayout {
    /// Copy centered; the artifact sits behind it.
    Centered,
    /// Copy occupies the left half.
    TextLeft,
    /// Copy occupies the right half.
    TextRight,
}

impl StageLayout {
    /// Where the persistent artifact floats so it never covers the copy.
    #[must_use]
    pub const fn artifact_anchor(self) -> ArtifactAnchor {
        match self {
            Self::Centered => ArtifactAnchor::Center,
            Self::TextLeft => ArtifactAnchor::Right,
            Self::TextRight => ArtifactAnchor::Left,
        }
    }
}

/// Horizontal resting place of the persistent artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactAnchor {
    Left,
    Center,
    Right,
}

/// Theme token for a stage. Total and pure.
#[must_use]
pub const fn theme_for(stage: StageId) -> ThemeToken {
    stage.theme()
}

/// Theme token for a raw section element id, falling back to
/// [`ThemeToken::DEFAULT`] for ids outside the registry.
#[must_use]
pub fn theme_for_element_id(id: &str) -> ThemeToken {
    StageId::from_element_id(id).map_or(ThemeToken::DEFAULT, StageId::theme)
}

/// Layout for a stage.
#[must_use]
pub const fn layout_for(stage: StageId) -> StageLayout {
    stage.layout()
}

/// All stages in document order. Restartable: each call yields a fresh iterator.
pub fn all_stages() -> impl ExactSizeIterator<Item = StageId> + Clone {
    StageId::ALL.into_iter()
}
