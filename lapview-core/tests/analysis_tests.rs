//! Integration tests for the lap analyzer over decoded payloads

use lapview_core::analysis::gear::predicted_speed;
use lapview_core::model::SessionPayload;
use lapview_core::{bounds_of, AnalysisSettings, LapAnalysis, LapStats};

/// Helper: a payload whose single lap brakes hard at sample 40 and accelerates at sample 110
fn payload_json() -> String {
    let mut points = Vec::new();
    for i in 0..200 {
        let speed = match i {
            0..=59 => 140.0,
            60..=129 => 60.0,
            _ => 150.0,
        };
        points.push(serde_json::json!({
            "lat": 35.0 + i as f64 * 1e-5,
            "lng": 139.0,
            "speed": speed,
            "rpm": 9000.0,
            "throttle": 60.0,
            "runtime": 300.0 + i as f64 * 0.1,
        }));
    }
    serde_json::json!({
        "laps": [{"lap_number": 1, "track": points}],
        "lap_times": ["0:19.900"],
        "vehicle_specs": {
            "primary_ratio": 1.8,
            "gear_ratios": {"1": 2.8, "2": 2.0, "3": 1.6, "4": 1.35, "5": 1.18, "6": 1.05},
            "front_sprocket": 16,
            "rear_sprocket": 48,
            "rear_tyre_size": "120/70-17"
        }
    })
    .to_string()
}

#[test]
fn test_analysis_of_decoded_payload() {
    let payload: SessionPayload = serde_json::from_str(&payload_json()).unwrap();
    let drivetrain = payload.drivetrain().expect("specs are complete");
    let lap = &payload.laps[0];

    let analysis = LapAnalysis::run(&lap.track, Some(&drivetrain), &AnalysisSettings::default());
    assert_eq!(analysis.significant.braking, vec![35]);
    assert_eq!(analysis.significant.acceleration, vec![105]);

    let gears = analysis.gears.as_ref().expect("drivetrain present");
    assert_eq!(gears.len(), lap.track.len());
    assert!(analysis.has_gears());
}

#[test]
fn test_gear_follows_speed_at_constant_rpm() {
    let payload: SessionPayload = serde_json::from_str(&payload_json()).unwrap();
    let drivetrain = payload.drivetrain().unwrap();
    let analysis = LapAnalysis::run(&payload.laps[0].track, Some(&drivetrain), &AnalysisSettings::default());

    // At 9000rpm, 60 km/h and 140 km/h resolve to different gears
    let slow = analysis.gear_at(90).unwrap();
    let fast = analysis.gear_at(10).unwrap();
    assert!(slow < fast, "slow gear {} should be below fast gear {}", slow, fast);

    let slow_ratio = drivetrain.gear_ratios[&slow];
    let predicted = predicted_speed(9000.0, slow_ratio, &drivetrain).unwrap();
    assert!((predicted - 60.0).abs() <= 60.0 * 0.2 + 5.0);
}

#[test]
fn test_analysis_without_specs_has_no_gears() {
    let mut payload: SessionPayload = serde_json::from_str(&payload_json()).unwrap();
    payload.vehicle_specs.as_mut().unwrap().front_sprocket = None;
    assert!(payload.drivetrain().is_none());

    let analysis = LapAnalysis::run(
        &payload.laps[0].track,
        payload.drivetrain().as_ref(),
        &AnalysisSettings::default(),
    );
    assert!(analysis.gears.is_none());
    assert!(!analysis.has_gears());
    assert_eq!(analysis.gear_at(0), None);
}

#[test]
fn test_lap_stats_and_bounds_of_payload() {
    let payload: SessionPayload = serde_json::from_str(&payload_json()).unwrap();
    let lap = &payload.laps[0];

    let stats = LapStats::of(&lap.track);
    assert_eq!(stats.min_speed.0, 60.0);
    assert_eq!(stats.max_speed.0, 150.0);
    assert!((stats.start_time.0 - 300.0).abs() < 1e-9);
    assert!((stats.duration.0 - 19.9).abs() < 1e-9);

    let bounds = bounds_of(lap.map_points()).unwrap();
    assert!((bounds.north - (35.0 + 199.0 * 1e-5)).abs() < 1e-12);
    assert_eq!(bounds.west, 139.0);
}
