//! Gear estimation from engine speed, ground speed and drivetrain geometry
//!
//! Each candidate gear predicts a road speed for the sample's rpm; the gear
//! whose prediction is closest to the measured speed wins, provided the error
//! is inside a tolerance that widens with speed.

use crate::model::{Drivetrain, TrackPoint};
use std::collections::BTreeMap;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Relative part of the acceptance tolerance (fraction of measured speed)
const TOLERANCE_RATIO: f64 = 0.2;
/// Fixed part of the acceptance tolerance (km/h)
const TOLERANCE_FLOOR_KMH: f64 = 5.0;

/// Road speed (km/h) the drivetrain produces at `rpm` with the given gear ratio
pub fn predicted_speed(rpm: f64, gear_ratio: f64, drivetrain: &Drivetrain) -> Option<f64> {
    let total_ratio = drivetrain.total_ratio(gear_ratio);
    if rpm <= 0.0 || total_ratio <= 0.0 {
        return None;
    }
    let wheel_rpm = rpm / total_ratio;
    Some(wheel_rpm * drivetrain.rear_tyre.circumference().0 * 60.0 / 1000.0)
}

/// Most plausible gear for one sample
///
/// `None` when the sample has no usable rpm or speed, or when no gear
/// predicts the measured speed within `speed * 0.2 + 5` km/h.
pub fn estimate_gear(point: &TrackPoint, drivetrain: &Drivetrain) -> Option<u8> {
    let rpm = point.rpm.map(|r| r.0).filter(|r| *r > 0.0)?;
    let speed = point.speed.0;
    if speed <= 0.0 {
        return None;
    }

    let mut best: Option<(u8, f64)> = None;
    for (&gear, &ratio) in &drivetrain.gear_ratios {
        let Some(predicted) = predicted_speed(rpm, ratio, drivetrain) else {
            continue;
        };
        let diff = (predicted - speed).abs();
        if best.map_or(true, |(_, d)| diff < d) {
            best = Some((gear, diff));
        }
    }

    let (gear, diff) = best?;
    (diff <= speed * TOLERANCE_RATIO + TOLERANCE_FLOOR_KMH).then_some(gear)
}

/// Per-sample gear estimates for a whole track
pub fn estimate_gears(track: &[TrackPoint], drivetrain: &Drivetrain) -> Vec<Option<u8>> {
    track.iter().map(|p| estimate_gear(p, drivetrain)).collect()
}

/// Centered sliding-window mode filter over gear estimates
///
/// Missing estimates are ignored when voting; ties go to the lower gear. A
/// window with no estimates at all passes the original value through.
pub fn smooth_gear_sequence(estimates: &[Option<u8>], window_size: usize) -> Vec<Option<u8>> {
    let half = window_size / 2;
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();

    (0..estimates.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(estimates.len());

            counts.clear();
            for gear in estimates[lo..hi].iter().flatten() {
                *counts.entry(*gear).or_default() += 1;
            }

            let mut mode: Option<(u8, usize)> = None;
            for (&gear, &count) in &counts {
                if mode.map_or(true, |(_, c)| count > c) {
                    mode = Some((gear, count));
                }
            }
            mode.map(|(gear, _)| gear).or(estimates[i])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VehicleSpecs;
    use crate::units::{KilometersPerHour, Rpm, Seconds};
    use proptest::prelude::*;

    fn drivetrain(gears: &[(u8, f64)]) -> Drivetrain {
        VehicleSpecs {
            primary_ratio: Some(1.8),
            gear_ratios: Some(gears.iter().copied().collect()),
            front_sprocket: Some(16),
            rear_sprocket: Some(48),
            rear_tyre_size: Some("120/70-17".to_string()),
        }
        .drivetrain()
        .unwrap()
    }

    fn sample(rpm: Option<f64>, speed: f64) -> TrackPoint {
        TrackPoint {
            lat: 0.0,
            lng: 0.0,
            speed: KilometersPerHour(speed),
            rpm: rpm.map(Rpm),
            throttle: None,
            runtime: Seconds(0.0),
        }
    }

    fn six_speed() -> Drivetrain {
        drivetrain(&[(1, 2.8), (2, 2.0), (3, 1.6), (4, 1.35), (5, 1.18), (6, 1.05)])
    }

    #[test]
    fn test_exact_match_single_gear() {
        let dt = drivetrain(&[(3, 1.5)]);
        let speed = predicted_speed(8000.0, 1.5, &dt).unwrap();
        assert_eq!(estimate_gear(&sample(Some(8000.0), speed), &dt), Some(3));
    }

    #[test]
    fn test_zero_rpm_has_no_estimate() {
        assert_eq!(estimate_gear(&sample(Some(0.0), 80.0), &six_speed()), None);
        assert_eq!(estimate_gear(&sample(None, 80.0), &six_speed()), None);
    }

    #[test]
    fn test_stationary_has_no_estimate() {
        assert_eq!(estimate_gear(&sample(Some(3000.0), 0.0), &six_speed()), None);
    }

    #[test]
    fn test_picks_closest_gear() {
        let dt = six_speed();
        for (gear, ratio) in dt.gear_ratios.clone() {
            let speed = predicted_speed(9000.0, ratio, &dt).unwrap();
            assert_eq!(
                estimate_gear(&sample(Some(9000.0), speed * 1.02), &dt),
                Some(gear)
            );
        }
    }

    #[test]
    fn test_rejects_outside_tolerance() {
        let dt = drivetrain(&[(1, 2.8)]);
        let predicted = predicted_speed(6000.0, 2.8, &dt).unwrap();
        let speed = predicted / 2.0;
        // tolerance at `speed` is speed*0.2+5, far below the error of predicted/2
        assert!(predicted - speed > speed * 0.2 + 5.0);
        assert_eq!(estimate_gear(&sample(Some(6000.0), speed), &dt), None);
    }

    #[test]
    fn test_estimate_gears_per_sample() {
        let dt = six_speed();
        let second = predicted_speed(7000.0, 2.0, &dt).unwrap();
        let track = [sample(Some(7000.0), second), sample(None, 50.0)];
        assert_eq!(estimate_gears(&track, &dt), vec![Some(2), None]);
    }

    #[test]
    fn test_smoothing_removes_single_sample_glitch() {
        let raw = [Some(2), Some(2), Some(5), Some(2), Some(2), Some(3), Some(3), Some(3), Some(3)];
        let smoothed = smooth_gear_sequence(&raw, 5);
        assert_eq!(
            smoothed,
            vec![Some(2), Some(2), Some(2), Some(2), Some(2), Some(3), Some(3), Some(3), Some(3)]
        );
    }

    #[test]
    fn test_smoothing_ignores_missing_and_passes_through_gaps() {
        let raw = [None, None, None, None, None, Some(4), None];
        let smoothed = smooth_gear_sequence(&raw, 5);
        assert_eq!(smoothed, vec![None, None, None, Some(4), Some(4), Some(4), Some(4)]);
    }

    #[test]
    fn test_smoothing_tie_goes_to_lower_gear() {
        let raw = [Some(4), Some(3), Some(4), Some(3)];
        let smoothed = smooth_gear_sequence(&raw, 3);
        assert_eq!(smoothed, vec![Some(3), Some(4), Some(3), Some(3)]);
    }

    #[test]
    fn test_smoothing_preserves_length() {
        assert!(smooth_gear_sequence(&[], 5).is_empty());
        assert_eq!(smooth_gear_sequence(&[Some(1)], 5), vec![Some(1)]);
    }

    #[test]
    fn test_smoothing_is_idempotent_on_step_sequences() {
        let mut raw = Vec::new();
        for gear in [1u8, 2, 3, 4, 3, 2] {
            raw.extend(std::iter::repeat(Some(gear)).take(12));
        }
        raw[7] = Some(6);
        raw[30] = None;
        raw[50] = Some(1);

        let once = smooth_gear_sequence(&raw, 5);
        let twice = smooth_gear_sequence(&once, 5);
        assert_eq!(once, twice);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_estimate_is_call_order_independent(
            rpms in prop::collection::vec(0.0f64..14000.0, 1..50),
            speeds in prop::collection::vec(0.0f64..250.0, 1..50),
        ) {
            let dt = six_speed();
            let samples: Vec<TrackPoint> = rpms
                .iter()
                .zip(speeds.iter())
                .map(|(r, s)| sample(Some(*r), *s))
                .collect();

            let forward: Vec<Option<u8>> = samples.iter().map(|p| estimate_gear(p, &dt)).collect();
            let mut backward: Vec<Option<u8>> = samples.iter().rev().map(|p| estimate_gear(p, &dt)).collect();
            backward.reverse();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_smoothing_keeps_length_and_fills_only_from_window(
            raw in prop::collection::vec(prop::option::of(1u8..7), 0..120),
        ) {
            let smoothed = smooth_gear_sequence(&raw, 5);
            prop_assert_eq!(smoothed.len(), raw.len());
            for (i, gear) in smoothed.iter().enumerate() {
                if let Some(g) = gear {
                    let lo = i.saturating_sub(2);
                    let hi = (i + 3).min(raw.len());
                    prop_assert!(raw[lo..hi].contains(&Some(*g)));
                }
            }
        }
    }
}
