//! Braking and acceleration event detection
//!
//! Compares each sample's speed with the sample `lookahead` positions later.
//! The fixed lookahead acts as a noise-tolerant derivative; the cooldown keeps
//! a long braking zone from producing a marker on every sample.

use crate::model::TrackPoint;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LOOKAHEAD: usize = 25;
pub const DEFAULT_SPEED_CHANGE_THRESHOLD: f64 = 4.0;
pub const DEFAULT_COOLDOWN: usize = 30;

/// Tuning for [`find_significant_points`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignificantPointOptions {
    /// Samples between the compared pair
    pub lookahead: usize,
    /// Minimum speed change (km/h) across the lookahead
    pub speed_change_threshold: f64,
    /// Samples that must pass after a flag before the next one of the same
    /// kind; the first sample is treated as just after a flag
    pub cooldown: usize,
}

impl Default for SignificantPointOptions {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            speed_change_threshold: DEFAULT_SPEED_CHANGE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Indices of flagged samples, each list strictly increasing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignificantPoints {
    pub braking: Vec<usize>,
    pub acceleration: Vec<usize>,
}

impl SignificantPoints {
    pub fn total(&self) -> usize {
        self.braking.len() + self.acceleration.len()
    }
}

pub fn find_significant_points(
    track: &[TrackPoint],
    options: &SignificantPointOptions,
) -> SignificantPoints {
    let mut points = SignificantPoints::default();
    let lookahead = options.lookahead.max(1);
    if track.len() <= lookahead {
        return points;
    }

    // Flags need a gap of more than `cooldown`; before any flag, index 0 is still cooling down
    let cooled = |last: Option<usize>, i: usize| i > last.map_or(0, |l| l + options.cooldown);
    let mut last_brake: Option<usize> = None;
    let mut last_accel: Option<usize> = None;

    for i in 0..track.len() - lookahead {
        let speed_diff = track[i].speed.0 - track[i + lookahead].speed.0;

        if speed_diff > options.speed_change_threshold && cooled(last_brake, i) {
            points.braking.push(i);
            last_brake = Some(i);
        } else if -speed_diff > options.speed_change_threshold && cooled(last_accel, i) {
            points.acceleration.push(i);
            last_accel = Some(i);
        }
    }

    points
}
