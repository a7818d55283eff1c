//! Derived signals for a single lap
//!
//! Everything here is a pure function of the lap's samples (and the vehicle's
//! drivetrain), recomputed whenever the active lap changes.

pub mod gear;
pub mod significant;

pub use gear::{estimate_gear, estimate_gears, smooth_gear_sequence};
pub use significant::{find_significant_points, SignificantPointOptions, SignificantPoints};

use crate::model::{Drivetrain, TrackPoint};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Analyzer tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    pub significant: SignificantPointOptions,
    pub smoothing_window: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            significant: SignificantPointOptions::default(),
            smoothing_window: gear::DEFAULT_SMOOTHING_WINDOW,
        }
    }
}

/// Analyzer output for one lap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapAnalysis {
    pub significant: SignificantPoints,
    /// Smoothed gear per sample, same length as the track; `None` without a drivetrain
    pub gears: Option<Vec<Option<u8>>>,
}

impl LapAnalysis {
    pub fn run(
        track: &[TrackPoint],
        drivetrain: Option<&Drivetrain>,
        settings: &AnalysisSettings,
    ) -> Self {
        let significant = find_significant_points(track, &settings.significant);
        let gears = drivetrain.map(|dt| {
            let raw = estimate_gears(track, dt);
            smooth_gear_sequence(&raw, settings.smoothing_window)
        });

        debug!(
            samples = track.len(),
            braking = significant.braking.len(),
            acceleration = significant.acceleration.len(),
            gears = gears.is_some(),
            "Lap analyzed"
        );
        Self { significant, gears }
    }

    /// Whether at least one sample received a gear estimate
    pub fn has_gears(&self) -> bool {
        self.gears
            .as_ref()
            .is_some_and(|gears| gears.iter().any(Option::is_some))
    }

    pub fn gear_at(&self, index: usize) -> Option<u8> {
        self.gears.as_ref()?.get(index).copied().flatten()
    }
}
