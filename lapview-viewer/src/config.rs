//! Viewer configuration
//!
//! [`ViewerConfig`] is what the host page hands the viewer when it opens
//! (`sessionId`, `sessionName`, `dataUrl`, `isPublicPage`). It is validated
//! once, at the loader boundary. [`PlaybackSettings`] holds the render and
//! playback tuning knobs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("invalid value {value:?} for `{field}`")]
    Invalid { field: &'static str, value: String },
}

/// Per-activation viewer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    pub session_id: String,
    #[serde(default)]
    pub session_name: String,
    pub data_url: String,
    #[serde(default)]
    pub is_public_page: bool,
}

impl ViewerConfig {
    pub fn new(session_id: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            session_name: String::new(),
            data_url: data_url.into(),
            is_public_page: false,
        }
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    pub fn public(mut self, is_public_page: bool) -> Self {
        self.is_public_page = is_public_page;
        self
    }

    /// Build from the string attributes a host element carries
    ///
    /// Recognized keys: `sessionId`, `sessionName`, `dataUrl`, `isPublicPage`.
    /// Unknown keys are ignored.
    pub fn from_dataset(dataset: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| dataset.get(key).map(|v| v.trim().to_string());

        let is_public_page = match get("isPublicPage").as_deref() {
            None | Some("") => false,
            Some(flag) => parse_flag(flag).ok_or_else(|| ConfigError::Invalid {
                field: "isPublicPage",
                value: flag.to_string(),
            })?,
        };

        let config = Self {
            session_id: get("sessionId").unwrap_or_default(),
            session_name: get("sessionName").unwrap_or_default(),
            data_url: get("dataUrl").unwrap_or_default(),
            is_public_page,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_id.trim().is_empty() {
            return Err(ConfigError::Missing("sessionId"));
        }
        if self.data_url.trim().is_empty() {
            return Err(ConfigError::Missing("dataUrl"));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Playback and rendering tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// Period of the frame loop
    pub frame_interval: Duration,
    /// Minimum wall time between chart/HUD redraws while playing
    pub redraw_interval: Duration,
    /// Full-scale value of the rpm readout
    pub rpm_reference: f64,
    /// Fraction of `rpm_reference` at which the readout turns red
    pub redline_fraction: f64,
    /// Number of discrete colors in the speed polyline
    pub speed_buckets: usize,
    /// Stroke width of the speed polyline
    pub polyline_width: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(16),
            redraw_interval: Duration::from_millis(100),
            rpm_reference: 14_000.0,
            redline_fraction: 0.85,
            speed_buckets: 20,
            polyline_width: 4.0,
        }
    }
}

impl PlaybackSettings {
    pub(crate) fn redraw_interval_ms(&self) -> f64 {
        self.redraw_interval.as_secs_f64() * 1000.0
    }
}
