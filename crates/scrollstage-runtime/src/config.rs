#![forbid(unsafe_code)]

//! Narrative configuration as data.
//!
//! Every tunable of the narrative lives in [`NarrativeConfig`]. Defaults are
//! the values the page has always shipped with, so `NarrativeConfig::default()`
//! needs no file at all.
//!
//! # Loading
//!
//! ```toml
//! # scrollstage.toml
//! tie_break = "last-reported"
//!
//! [observer]
//! threshold = 0.5
//! root_margin = "-10% 0px -10% 0px"
//! ```
//!
//! ```rust,ignore
//! let config = NarrativeConfig::from_toml_file("scrollstage.toml")?;
//! let config = NarrativeConfig::from_json_str(json)?;
//! ```

#[cfg(feature = "policy-config")]
use std::path::Path;

#[cfg(feature = "policy-config")]
use serde::{Deserialize, Serialize};

use scrollstage_core::{MarginLength, ObserverOptions};

use crate::stage_observer::TieBreak;

/// All narrative tunables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "policy-config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct NarrativeConfig {
    /// How simultaneous intersecting sections in one batch are resolved.
    pub tie_break: TieBreak,

    /// Intersection watcher tuning (threshold 0.5, `-10% 0px -10% 0px`).
    pub observer: ObserverOptions,
}

impl NarrativeConfig {
    /// Load from a TOML string. The result is validated.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(ConfigError::Toml)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string. The result is validated.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty TOML.
    #[cfg(feature = "policy-config")]
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::TomlSer)
    }

    /// Problems with this configuration. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let threshold = self.observer.threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            errors.push(format!(
                "observer.threshold must be in [0, 1], got {threshold}"
            ));
        }
        let margin = self.observer.root_margin;
        for (side, length) in [
            ("top", margin.top),
            ("right", margin.right),
            ("bottom", margin.bottom),
            ("left", margin.left),
        ] {
            let value = match length {
                MarginLength::Px(v) | MarginLength::Percent(v) => v,
            };
            if !value.is_finite() {
                errors.push(format!("observer.root_margin.{side} must be finite"));
            }
        }
        // Shrinking more than the whole viewport leaves nothing to intersect.
        if let (MarginLength::Percent(top), MarginLength::Percent(bottom)) =
            (margin.top, margin.bottom)
            && top + bottom <= -100.0
        {
            errors.push(format!(
                "observer.root_margin trims {}% of the viewport height",
                -(top + bottom)
            ));
        }
        errors
    }

    /// `self` if valid, otherwise [`ConfigError::Validation`].
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading or validating a [`NarrativeConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "policy-config")]
    Toml(toml::de::Error),
    /// TOML serialization error.
    #[cfg(feature = "policy-config")]
    TomlSer(toml::ser::Error),
    /// JSON parse error.
    #[cfg(feature = "policy-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::TomlSer(e) => write!(f, "TOML serialization error: {e}"),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::TomlSer(e) => Some(e),
            #[cfg(feature = "policy-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}
