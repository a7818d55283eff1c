//! Integration tests for ViewerSession: loading, controls and playback

use lapview_core::timing::fastest_lap_index;
use lapview_core::units::{KilometersPerHour, Seconds};
use lapview_core::{Lap, SessionPayload, SourceError, TrackPoint};
use lapview_sources::DemoSource;
use lapview_viewer::headless::PanelStatus;
use lapview_viewer::surface::{ChartKind, MarkerKind};
use lapview_viewer::{
    ControlEvent, FramePosition, HeadlessSession, LoadError, LoadOutcome, ManualClock,
    SessionPhase, Tick, ViewerConfig,
};

fn config() -> ViewerConfig {
    ViewerConfig::new("42", "/activity/session/42/gps_data").with_session_name("Test day")
}

fn session() -> (HeadlessSession<ManualClock>, ManualClock) {
    let clock = ManualClock::new(1_000_000.0);
    (HeadlessSession::headless(config(), clock.clone()), clock)
}

fn demo(laps: usize) -> SessionPayload {
    DemoSource::new().with_laps(laps).generate()
}

fn ready_session(payload: SessionPayload) -> (HeadlessSession<ManualClock>, ManualClock) {
    let (mut session, clock) = session();
    let ticket = session.begin_load();
    assert!(matches!(
        session.finish_load(ticket, Ok(payload)),
        LoadOutcome::Ready(_)
    ));
    (session, clock)
}

/// One lap of three samples at runtime 0, 1 and 2 seconds
fn three_point_payload() -> SessionPayload {
    let track = (0..3)
        .map(|i| TrackPoint {
            lat: 35.0 + i as f64 * 0.001,
            lng: 139.0,
            speed: KilometersPerHour(100.0 + i as f64 * 10.0),
            rpm: None,
            throttle: None,
            runtime: Seconds(i as f64),
        })
        .collect();
    SessionPayload {
        laps: vec![Lap {
            lap_number: 1,
            track,
            map_track: None,
        }],
        lap_times: vec!["0:02.000".to_string()],
        vehicle_specs: None,
    }
}

fn assert_no_dangling_objects(session: &HeadlessSession<ManualClock>) {
    let coordinator = session.coordinator();
    assert_eq!(coordinator.map().live_overlays(), coordinator.overlay_count());
    assert_eq!(
        coordinator.charts().live_charts(),
        coordinator.chart_kinds().len()
    );
}

// ==================== Loading ====================

#[test]
fn test_load_selects_fastest_lap() {
    let payload = demo(4);
    let fastest = fastest_lap_index(&payload.lap_times).unwrap();
    let (session, _) = ready_session(payload);

    assert_eq!(session.phase(), &SessionPhase::Ready);
    assert_eq!(session.current_lap(), Some(fastest));

    let panel = session.panel();
    assert_eq!(panel.status, PanelStatus::Ready);
    assert_eq!(panel.session_name, "Test day");
    assert_eq!(panel.selected, Some(fastest));
    let labels = panel.labels();
    assert_eq!(labels.len(), 4);
    assert_eq!(labels.iter().filter(|l| l.starts_with("👑 ")).count(), 1);
    assert!(labels[fastest].starts_with(&format!("👑 Lap {} (", fastest + 1)));
}

#[test]
fn test_load_draws_lap_with_gears() {
    let (session, _) = ready_session(demo(2));
    let coordinator = session.coordinator();

    assert_eq!(
        coordinator.chart_kinds(),
        vec![
            ChartKind::Speed,
            ChartKind::Rpm,
            ChartKind::Throttle,
            ChartKind::Gear
        ]
    );
    assert!(coordinator.dashboard().gear_visible);
    assert_ne!(coordinator.dashboard().gear, "-");
    assert!(coordinator.map().marker_position(MarkerKind::Position).is_some());
    assert!(coordinator.segment_count() > 0);
    assert_no_dangling_objects(&session);
}

#[test]
fn test_incomplete_specs_hide_gears() {
    let mut payload = demo(1);
    if let Some(specs) = payload.vehicle_specs.as_mut() {
        specs.front_sprocket = None;
    }
    let (session, _) = ready_session(payload);
    let coordinator = session.coordinator();

    assert!(!coordinator.chart_kinds().contains(&ChartKind::Gear));
    assert!(!coordinator.dashboard().gear_visible);
}

#[test]
fn test_empty_payload_is_no_data() {
    let (mut session, _) = session();
    let ticket = session.begin_load();
    assert_eq!(session.panel().status, PanelStatus::Loading);

    let outcome = session.finish_load(ticket, Ok(SessionPayload::default()));
    assert!(matches!(outcome, LoadOutcome::Failed(LoadError::NoData)));
    assert_eq!(session.phase(), &SessionPhase::NoData);
    assert_eq!(session.panel().status, PanelStatus::NoData);
    assert_eq!(session.coordinator().map().live_overlays(), 0);
}

#[test]
fn test_fetch_failure_is_error_not_no_data() {
    let (mut session, _) = session();
    let ticket = session.begin_load();

    let outcome = session.finish_load(ticket, Err(SourceError::Status(503)));
    assert!(matches!(
        outcome,
        LoadOutcome::Failed(LoadError::Source(SourceError::Status(503)))
    ));
    assert!(matches!(session.phase(), SessionPhase::Failed(_)));
    assert!(matches!(session.panel().status, PanelStatus::Error(_)));
    assert!(session.state().is_none());
}

#[test]
fn test_stale_response_is_ignored() {
    let (mut session, _) = session();
    let first = session.begin_load();
    let second = session.begin_load();

    assert!(matches!(
        session.finish_load(second, Ok(demo(2))),
        LoadOutcome::Ready(_)
    ));
    assert!(matches!(
        session.finish_load(first, Ok(demo(5))),
        LoadOutcome::Stale
    ));
    assert_eq!(session.payload().map(|p| p.laps.len()), Some(2));

    // A stale failure does not clobber the loaded session either
    assert!(matches!(
        session.finish_load(first, Err(SourceError::Status(500))),
        LoadOutcome::Stale
    ));
    assert_eq!(session.phase(), &SessionPhase::Ready);
}

#[test]
fn test_controls_are_inert_while_loading() {
    let (mut session, _) = session();
    session.begin_load();

    session.handle(ControlEvent::Play);
    session.handle(ControlEvent::SelectLap(0));
    assert!(!session.is_playing());
    assert!(session.current_lap().is_none());
}

#[tokio::test]
async fn test_load_from_source() {
    let (mut session, _) = session();
    let outcome = session.load_from(&DemoSource::new().with_laps(2)).await;
    assert!(matches!(outcome, LoadOutcome::Ready(_)));
    assert_eq!(session.lap_options().len(), 2);
}

// ==================== Playback ====================

#[test]
fn test_playback_interpolates_between_samples() {
    let (mut session, clock) = ready_session(three_point_payload());

    assert!(session.play());
    clock.advance(1_500.0);
    assert_eq!(
        session.on_frame(),
        Tick::Frame(FramePosition {
            index: 1,
            ratio: 0.5
        })
    );

    let state = session.state().unwrap();
    assert_eq!(state.current_lap_index, 0);
    assert!(state.is_playing);
    assert!((state.virtual_elapsed_seconds - 1.5).abs() < 1e-9);

    let readout = session.coordinator().dashboard();
    assert_eq!(readout.playback_time, "00:01.500");
    assert_eq!(readout.scrub_value, Some(1));
    assert!((readout.speed.unwrap() - 115.0).abs() < 1e-9);
}

#[test]
fn test_playback_finishes_on_last_sample() {
    let (mut session, clock) = ready_session(three_point_payload());
    session.handle(ControlEvent::TogglePlayback);
    assert!(session.panel().playing);

    clock.advance(5_000.0);
    assert_eq!(session.on_frame(), Tick::Finished(FramePosition::at(2)));
    assert!(!session.is_playing());
    assert!(!session.panel().playing);
    assert_eq!(session.coordinator().dashboard().scrub_value, Some(2));

    // Playing again from the end starts over
    assert!(session.play());
    assert_eq!(session.playback().position(), FramePosition::at(0));
}

#[test]
fn test_pause_freezes_position() {
    let (mut session, clock) = ready_session(three_point_payload());
    session.play();
    clock.advance(500.0);
    session.on_frame();

    session.handle(ControlEvent::Pause);
    assert!(!session.is_playing());
    let frozen = session.state().unwrap().virtual_elapsed_seconds;

    clock.advance(10_000.0);
    assert_eq!(session.on_frame(), Tick::Idle);
    assert_eq!(session.state().unwrap().virtual_elapsed_seconds, frozen);
    assert!((frozen - 0.5).abs() < 1e-9);
}

#[test]
fn test_scrub_while_playing_keeps_playing() {
    let (mut session, clock) = ready_session(demo(1));
    session.play();
    clock.advance(1_000.0);
    session.on_frame();

    session.handle(ControlEvent::Scrub(200));
    assert!(session.is_playing());
    assert_eq!(session.coordinator().dashboard().scrub_value, Some(200));

    clock.advance(1_000.0);
    let Tick::Frame(position) = session.on_frame() else {
        panic!("expected playback to continue");
    };
    // 10Hz demo: one second later is ten samples on
    assert!((209..=210).contains(&position.index), "index {}", position.index);
}

#[test]
fn test_scrub_while_stopped_stays_stopped() {
    let (mut session, _) = ready_session(demo(1));
    let readout = session.scrub(50).unwrap();
    assert_eq!(readout.index, 50);
    assert!(readout.redrawn);
    assert!(!session.is_playing());

    let clamped = session.scrub(1_000_000).unwrap();
    assert_eq!(Some(clamped.index), session.coordinator().dashboard().scrub_max);
}

#[test]
fn test_lap_change_stops_playback_and_disposes_previous_lap() {
    let (mut session, clock) = ready_session(demo(3));
    session.play();
    clock.advance(3_000.0);
    session.on_frame();

    let other = (session.current_lap().unwrap() + 1) % 3;
    session.handle(ControlEvent::SelectLap(other));

    assert!(!session.is_playing());
    assert!(!session.panel().playing);
    assert_eq!(session.current_lap(), Some(other));
    assert_eq!(session.panel().selected, Some(other));
    assert_eq!(session.state().unwrap().virtual_elapsed_seconds, 0.0);
    assert_no_dangling_objects(&session);

    // Cycling through every lap never accumulates objects
    for lap in 0..3 {
        session.select_lap(lap);
        assert_no_dangling_objects(&session);
    }
}

#[test]
fn test_select_unknown_lap_is_rejected() {
    let (mut session, _) = ready_session(demo(2));
    let before = session.current_lap();
    assert!(!session.select_lap(7));
    assert_eq!(session.current_lap(), before);
}

// ==================== Toggles ====================

#[test]
fn test_marker_toggles() {
    let (mut session, _) = ready_session(demo(1));
    let overlays = session.coordinator().overlay_count();

    session.handle(ControlEvent::ShowBrakingMarkers(false));
    session.handle(ControlEvent::ShowAccelerationMarkers(false));
    let map = session.coordinator().map();
    assert_eq!(map.visible_markers(MarkerKind::Braking), 0);
    assert_eq!(map.visible_markers(MarkerKind::Acceleration), 0);
    assert_eq!(map.visible_markers(MarkerKind::Position), 1);
    assert_eq!(session.coordinator().overlay_count(), overlays);
}

#[test]
fn test_telemetry_panel_toggle() {
    let (mut session, _) = ready_session(demo(1));
    assert_eq!(session.toggle_telemetry_panel(), Some(false));
    assert!(!session.panel().telemetry_visible);
    assert_eq!(session.coordinator().map().layout_refreshes(), 1);

    session.handle(ControlEvent::ToggleTelemetryPanel);
    assert!(session.panel().telemetry_visible);
}

#[test]
fn test_public_page_has_no_telemetry_toggle() {
    let clock = ManualClock::new(0.0);
    let mut session = HeadlessSession::headless(config().public(true), clock);
    let ticket = session.begin_load();
    session.finish_load(ticket, Ok(demo(1)));

    assert_eq!(session.toggle_telemetry_panel(), None);
    assert_eq!(session.coordinator().map().layout_refreshes(), 0);
}

// ==================== Close ====================

#[test]
fn test_close_disposes_everything() {
    let (mut session, clock) = session();
    let pending = session.begin_load();
    let ticket = session.begin_load();
    session.finish_load(ticket, Ok(demo(2)));
    session.play();
    clock.advance(500.0);

    session.close();
    assert_eq!(session.phase(), &SessionPhase::Closed);
    assert!(!session.is_playing());
    assert_eq!(session.coordinator().map().live_overlays(), 0);
    assert_eq!(session.coordinator().charts().live_charts(), 0);
    assert!(session.state().is_none());

    // Late responses after close are dropped
    assert!(matches!(
        session.finish_load(pending, Ok(demo(1))),
        LoadOutcome::Stale
    ));
    assert!(matches!(
        session.finish_load(ticket, Ok(demo(1))),
        LoadOutcome::Stale
    ));
}
