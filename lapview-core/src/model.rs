//! Lap track data model
//!
//! Defines the payload served by a lap-data endpoint and the derived per-lap
//! scalars the viewer needs. Optional sensor channels use `Option<T>` because
//! not every logger records them.
//!
//! Coordinates are WGS84 degrees; `runtime` is seconds since the start of the
//! recording and is non-decreasing within a lap.

use crate::units::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single timestamped GPS + sensor sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lng: f64,

    /// Ground speed in km/h
    #[serde(default)]
    pub speed: KilometersPerHour,

    /// Engine speed, when the logger taps the ECU
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm: Option<Rpm>,

    /// Throttle opening (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttle: Option<Percentage>,

    /// Seconds since recording start
    #[serde(default)]
    pub runtime: Seconds,
}

impl TrackPoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// One continuous timed circuit of recorded points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lap {
    pub lap_number: u32,

    /// Full-resolution samples, in recording order
    #[serde(default)]
    pub track: Vec<TrackPoint>,

    /// Reduced-resolution samples used only for the map polyline and bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_track: Option<Vec<TrackPoint>>,
}

impl Lap {
    /// Points to draw on the map: `map_track` when present, else `track`
    pub fn map_points(&self) -> &[TrackPoint] {
        match &self.map_track {
            Some(points) if !points.is_empty() => points,
            _ => &self.track,
        }
    }

    /// A lap needs at least two samples to be drawn or replayed
    pub fn is_renderable(&self) -> bool {
        self.track.len() >= 2
    }
}

/// Payload returned by `GET <dataUrl>`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(default)]
    pub laps: Vec<Lap>,

    /// Formatted lap times, parallel to `laps`
    #[serde(default)]
    pub lap_times: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_specs: Option<VehicleSpecs>,
}

impl SessionPayload {
    /// Whether there is anything to show at all
    pub fn has_data(&self) -> bool {
        !self.laps.is_empty() && !self.lap_times.is_empty()
    }

    /// Validated drivetrain, if the vehicle specs are complete
    pub fn drivetrain(&self) -> Option<Drivetrain> {
        self.vehicle_specs.as_ref().and_then(VehicleSpecs::drivetrain)
    }
}

// === Drivetrain ===

/// Gear-estimation parameters as they arrive over the wire
///
/// Every field is optional on the wire; all of them must be present and valid
/// for gear estimation to be enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleSpecs {
    pub primary_ratio: Option<f64>,
    pub gear_ratios: Option<BTreeMap<u8, f64>>,
    pub front_sprocket: Option<u32>,
    pub rear_sprocket: Option<u32>,
    pub rear_tyre_size: Option<String>,
}

impl VehicleSpecs {
    /// Validate the specs into a [`Drivetrain`]; partial specs yield `None`
    pub fn drivetrain(&self) -> Option<Drivetrain> {
        let primary_ratio = self.primary_ratio.filter(|r| *r > 0.0)?;
        let gear_ratios = self.gear_ratios.as_ref()?;
        if gear_ratios.is_empty() || gear_ratios.values().any(|r| *r <= 0.0) {
            return None;
        }
        let front_sprocket = self.front_sprocket.filter(|t| *t > 0)?;
        let rear_sprocket = self.rear_sprocket.filter(|t| *t > 0)?;
        let rear_tyre = self.rear_tyre_size.as_deref()?.parse::<TyreSize>().ok()?;

        Some(Drivetrain {
            primary_ratio,
            gear_ratios: gear_ratios.clone(),
            front_sprocket,
            rear_sprocket,
            rear_tyre,
        })
    }
}

/// Complete, validated drivetrain description
#[derive(Debug, Clone, PartialEq)]
pub struct Drivetrain {
    pub primary_ratio: f64,
    pub gear_ratios: BTreeMap<u8, f64>,
    pub front_sprocket: u32,
    pub rear_sprocket: u32,
    pub rear_tyre: TyreSize,
}

impl Drivetrain {
    /// Final-drive ratio (rear / front sprocket teeth)
    pub fn secondary_ratio(&self) -> f64 {
        self.rear_sprocket as f64 / self.front_sprocket as f64
    }

    /// Engine revolutions per rear-wheel revolution in the given gear ratio
    pub fn total_ratio(&self, gear_ratio: f64) -> f64 {
        self.primary_ratio * self.secondary_ratio() * gear_ratio
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tyre size {0:?}, expected WIDTH/ASPECT-RIM (e.g. 120/70-17)")]
pub struct TyreSizeError(pub String);

/// Motorcycle tyre size in `WIDTH/ASPECT[-]RIM` notation, e.g. `120/70-17`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TyreSize {
    pub width_mm: f64,
    pub aspect_pct: f64,
    pub rim_inches: f64,
}

impl TyreSize {
    /// Rolling circumference of the tyre
    pub fn circumference(&self) -> Meters {
        let sidewall_mm = self.width_mm * self.aspect_pct / 100.0;
        let diameter_mm = self.rim_inches * 25.4 + 2.0 * sidewall_mm;
        Meters::from_millimeters(std::f64::consts::PI * diameter_mm)
    }
}

impl FromStr for TyreSize {
    type Err = TyreSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TyreSizeError(s.to_string());
        let (width, rest) = s.trim().split_once('/').ok_or_else(err)?;

        let aspect_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (aspect, rim) = rest.split_at(aspect_len);
        let rim = rim.strip_prefix('-').unwrap_or(rim);

        let number = |digits: &str| -> Option<f64> {
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            digits.parse::<f64>().ok().filter(|v| *v > 0.0)
        };

        Ok(TyreSize {
            width_mm: number(width).ok_or_else(err)?,
            aspect_pct: number(aspect).ok_or_else(err)?,
            rim_inches: number(rim).ok_or_else(err)?,
        })
    }
}

impl fmt::Display for TyreSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{}", self.width_mm, self.aspect_pct, self.rim_inches)
    }
}

// === Geography ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Linear interpolation between two positions (`ratio` in [0, 1])
    pub fn lerp(&self, other: &GeoPoint, ratio: f64) -> GeoPoint {
        GeoPoint {
            lat: self.lat + (other.lat - self.lat) * ratio,
            lng: self.lng + (other.lng - self.lng) * ratio,
        }
    }
}

/// Geographic extent of a set of points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    fn around(p: GeoPoint) -> Self {
        Self {
            south: p.lat,
            west: p.lng,
            north: p.lat,
            east: p.lng,
        }
    }

    pub fn extend(&mut self, p: GeoPoint) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lng);
        self.east = self.east.max(p.lng);
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lng)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }
}

/// Extent covering every point; `None` for an empty sequence
pub fn bounds_of(points: &[TrackPoint]) -> Option<GeoBounds> {
    let (first, rest) = points.split_first()?;
    let mut bounds = GeoBounds::around(first.position());
    for p in rest {
        bounds.extend(p.position());
    }
    Some(bounds)
}

// === Derived per-lap scalars ===

/// Simple derived scalars for one lap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapStats {
    /// Lowest speed among non-zero samples (0 when every sample is zero)
    pub min_speed: KilometersPerHour,
    pub max_speed: KilometersPerHour,
    /// Runtime of the first sample
    pub start_time: Seconds,
    /// Last runtime minus first runtime
    pub duration: Seconds,
}

impl LapStats {
    pub fn of(track: &[TrackPoint]) -> Self {
        let min_speed = track
            .iter()
            .map(|p| p.speed.0)
            .filter(|s| *s > 0.0)
            .reduce(f64::min)
            .unwrap_or(0.0);
        let max_speed = track.iter().map(|p| p.speed.0).fold(0.0_f64, f64::max);
        let start = track.first().map(|p| p.runtime.0).unwrap_or(0.0);
        let end = track.last().map(|p| p.runtime.0).unwrap_or(start);

        Self {
            min_speed: KilometersPerHour(min_speed),
            max_speed: KilometersPerHour(max_speed),
            start_time: Seconds(start),
            duration: Seconds(end - start),
        }
    }
}
