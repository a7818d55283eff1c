//! Type-safe wrappers for physical units
//!
//! Newtype wrappers around f64 so that speeds, engine speeds and runtimes
//! cannot be mixed up. All wrappers serialize as their bare inner value, which
//! keeps them compatible with the plain numeric fields of the lap payload.

use serde::{Deserialize, Serialize};

/// Kilometers per hour
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct KilometersPerHour(pub f64);

/// Revolutions per minute
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rpm(pub f64);

/// Seconds (sample runtimes, lap durations)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Seconds(pub f64);

/// Meters
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Meters(pub f64);

/// Percentage on a 0-100 scale (throttle opening)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percentage(pub f64);

impl Percentage {
    /// Create a new percentage, clamping to [0.0, 100.0]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    /// Get as a fraction (0.0-1.0)
    pub fn as_fraction(&self) -> f64 {
        self.0 / 100.0
    }
}

impl Meters {
    pub fn from_millimeters(mm: f64) -> Self {
        Self(mm / 1000.0)
    }
}
