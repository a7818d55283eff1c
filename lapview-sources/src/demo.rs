//! Demo source that generates a synthetic session for testing
//!
//! Simulates laps around an elliptical circuit with straights, braking zones,
//! corners and acceleration phases. Engine speed is derived from the same
//! drivetrain the payload advertises, so gear estimation works on the output.

use async_trait::async_trait;
use lapview_core::model::{Drivetrain, Lap, SessionPayload, TrackPoint, TyreSize, VehicleSpecs};
use lapview_core::source::{LapDataSource, SourceError};
use lapview_core::timing::format_lap_time;
use lapview_core::units::*;
use std::f64::consts::TAU;

// =============================================================================
// Track definition: segments that form one lap
// =============================================================================

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight, // Full throttle
    Braking,  // Hard braking into a corner
    Corner,   // Constant-ish speed, part throttle
    Accel,    // Driving out of a corner
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    duration: f64,     // seconds to traverse at reference pace
    target_speed: f64, // km/h at end of segment
}

const fn seg(kind: SegmentKind, duration: f64, target_speed: f64) -> TrackSegment {
    TrackSegment {
        kind,
        duration,
        target_speed,
    }
}

/// A club circuit: ~84s lap
fn demo_track() -> Vec<TrackSegment> {
    use SegmentKind::*;
    vec![
        // Main straight
        seg(Straight, 8.0, 220.0),
        // T1: heavy braking into a slow right-hander
        seg(Braking, 3.0, 80.0),
        seg(Corner, 4.0, 75.0),
        seg(Accel, 3.5, 160.0),
        seg(Straight, 4.0, 180.0),
        // T2: medium braking, fast left
        seg(Braking, 2.0, 120.0),
        seg(Corner, 3.5, 115.0),
        seg(Accel, 3.0, 160.0),
        // Back straight
        seg(Straight, 10.0, 230.0),
        // T3: chicane
        seg(Braking, 2.5, 95.0),
        seg(Corner, 2.0, 90.0),
        seg(Corner, 2.0, 85.0),
        seg(Accel, 3.0, 150.0),
        seg(Straight, 6.0, 195.0),
        // T4: long sweeper
        seg(Braking, 1.5, 145.0),
        seg(Corner, 5.0, 140.0),
        seg(Accel, 3.0, 170.0),
        // T5: hairpin
        seg(Braking, 3.5, 60.0),
        seg(Corner, 4.5, 55.0),
        seg(Accel, 4.0, 150.0),
        // Run to the line
        seg(Straight, 6.0, 210.0),
    ]
}

// =============================================================================
// Drivetrain of the demo bike
// =============================================================================

const PRIMARY_RATIO: f64 = 1.8;
const GEAR_RATIOS: [(u8, f64); 6] = [(1, 2.8), (2, 2.0), (3, 1.6), (4, 1.35), (5, 1.18), (6, 1.05)];
const FRONT_SPROCKET: u32 = 16;
const REAR_SPROCKET: u32 = 48;
const REAR_TYRE: TyreSize = TyreSize {
    width_mm: 180.0,
    aspect_pct: 55.0,
    rim_inches: 17.0,
};
const SHIFT_RPM: f64 = 11_500.0;
const IDLE_RPM: f64 = 1_500.0;

fn demo_drivetrain() -> Drivetrain {
    Drivetrain {
        primary_ratio: PRIMARY_RATIO,
        gear_ratios: GEAR_RATIOS.into_iter().collect(),
        front_sprocket: FRONT_SPROCKET,
        rear_sprocket: REAR_SPROCKET,
        rear_tyre: REAR_TYRE,
    }
}

/// Engine speed at `speed_kmh` in the lowest gear that stays under the shift point
fn speed_to_rpm(speed_kmh: f64, drivetrain: &Drivetrain) -> f64 {
    let wheel_rpm = speed_kmh * 1000.0 / 60.0 / drivetrain.rear_tyre.circumference().0;
    let mut rpm = IDLE_RPM;
    for (_, ratio) in GEAR_RATIOS {
        rpm = wheel_rpm * drivetrain.total_ratio(ratio);
        if rpm <= SHIFT_RPM {
            break;
        }
    }
    rpm.max(IDLE_RPM)
}

// =============================================================================
// Interpolation state at a position in the lap
// =============================================================================

struct LapState {
    speed: f64,
    throttle: f64,
}

fn compute_lap_state(track: &[TrackSegment], lap_time: f64) -> LapState {
    let mut elapsed = 0.0;
    let mut current = None;
    for (i, seg) in track.iter().enumerate() {
        if elapsed + seg.duration > lap_time {
            current = Some(i);
            break;
        }
        elapsed += seg.duration;
    }
    // Past the end of the lap: park at the end of the final segment
    let seg_idx = match current {
        Some(i) => i,
        None => {
            let last = track.len() - 1;
            elapsed -= track[last].duration;
            last
        }
    };

    let seg = track[seg_idx];
    let seg_t = ((lap_time - elapsed) / seg.duration).clamp(0.0, 1.0);

    let prev_target_speed = if seg_idx > 0 {
        track[seg_idx - 1].target_speed
    } else {
        track[track.len() - 1].target_speed
    };

    let smooth_t = smoothstep(seg_t);
    let speed = lerp(prev_target_speed, seg.target_speed, smooth_t);

    let throttle = match seg.kind {
        SegmentKind::Straight => 95.0 + 5.0 * (1.0 - seg_t),
        SegmentKind::Braking => 0.0,
        SegmentKind::Corner => 20.0 + 30.0 * seg_t,
        SegmentKind::Accel => 50.0 + 50.0 * smooth_t,
    };

    LapState { speed, throttle }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

// =============================================================================
// DemoSource
// =============================================================================

/// Circuit centre and ellipse half-axes (degrees)
const CENTER: (f64, f64) = (36.1505, 139.9196);
const HALF_AXES: (f64, f64) = (0.0035, 0.0055);
/// Seconds of out-lap before the first timed lap starts
const OUT_LAP_SECS: f64 = 12.0;
/// Every n-th sample goes into the reduced map track
const MAP_TRACK_STRIDE: usize = 5;

#[derive(Debug, Clone)]
pub struct DemoSource {
    laps: usize,
    sample_rate_hz: f64,
}

impl DemoSource {
    pub fn new() -> Self {
        Self {
            laps: 3,
            sample_rate_hz: 10.0,
        }
    }

    pub fn with_laps(mut self, laps: usize) -> Self {
        self.laps = laps;
        self
    }

    pub fn with_sample_rate(mut self, hz: f64) -> Self {
        self.sample_rate_hz = hz.max(1.0);
        self
    }

    /// Vehicle specs matching the drivetrain used to synthesize rpm
    pub fn vehicle_specs() -> VehicleSpecs {
        VehicleSpecs {
            primary_ratio: Some(PRIMARY_RATIO),
            gear_ratios: Some(GEAR_RATIOS.into_iter().collect()),
            front_sprocket: Some(FRONT_SPROCKET),
            rear_sprocket: Some(REAR_SPROCKET),
            rear_tyre_size: Some(REAR_TYRE.to_string()),
        }
    }

    /// Build the whole session payload deterministically
    pub fn generate(&self) -> SessionPayload {
        let track = demo_track();
        let drivetrain = demo_drivetrain();
        let reference_duration: f64 = track.iter().map(|s| s.duration).sum();
        let dt = 1.0 / self.sample_rate_hz;

        let mut laps = Vec::with_capacity(self.laps);
        let mut lap_times = Vec::with_capacity(self.laps);
        let mut lap_start = OUT_LAP_SECS;

        for lap_idx in 0..self.laps {
            // Vary pace by up to 2% per lap
            let pace = 1.0 + jitter(lap_idx as f64 + 0.5, 0.02);
            let samples = (reference_duration * pace * self.sample_rate_hz).round() as usize;

            let states: Vec<LapState> = (0..=samples)
                .map(|k| {
                    let reference_t = (k as f64 * dt / pace).min(reference_duration);
                    compute_lap_state(&track, reference_t)
                })
                .collect();

            // Distance along the lap drives the position on the ellipse
            let mut distances = Vec::with_capacity(states.len());
            let mut distance = 0.0;
            for state in &states {
                distances.push(distance);
                distance += state.speed / 3.6 * dt;
            }
            let lap_length = distance.max(f64::EPSILON);

            let points: Vec<TrackPoint> = states
                .iter()
                .zip(distances.iter())
                .enumerate()
                .map(|(k, (state, dist))| {
                    let n = (lap_idx * 100_000 + k) as f64;
                    let theta = TAU * dist / lap_length;
                    let speed = (state.speed + jitter(n, 0.5)).max(0.0);
                    let rpm = speed_to_rpm(speed, &drivetrain) + jitter(n * 1.1, 40.0);
                    TrackPoint {
                        lat: CENTER.0 + HALF_AXES.0 * theta.sin(),
                        lng: CENTER.1 + HALF_AXES.1 * theta.cos(),
                        speed: KilometersPerHour(speed),
                        rpm: Some(Rpm(rpm.max(IDLE_RPM))),
                        throttle: Some(Percentage::new(state.throttle + jitter(n * 1.2, 2.0))),
                        runtime: Seconds(lap_start + k as f64 * dt),
                    }
                })
                .collect();

            let map_track = points.iter().step_by(MAP_TRACK_STRIDE).copied().collect();
            let lap_time = samples as f64 * dt;

            laps.push(Lap {
                lap_number: lap_idx as u32 + 1,
                track: points,
                map_track: Some(map_track),
            });
            lap_times.push(format_lap_time(lap_time));
            lap_start += lap_time;
        }

        SessionPayload {
            laps,
            lap_times,
            vehicle_specs: Some(Self::vehicle_specs()),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LapDataSource for DemoSource {
    fn describe(&self) -> String {
        format!("demo ({} laps @ {}Hz)", self.laps, self.sample_rate_hz)
    }

    async fn fetch(&self) -> Result<SessionPayload, SourceError> {
        Ok(self.generate())
    }
}
