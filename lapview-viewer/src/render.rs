//! Render coordinator
//!
//! Owns every object drawn for the active lap (polyline segments, event
//! markers, the live-position marker, chart instances) and pushes playback
//! positions to the map, charts and HUD.
//!
//! Loading a lap always disposes everything drawn for the previous one first,
//! so the live overlay count is exactly what the current lap needs. The
//! position marker moves on every frame; chart cursors and HUD readouts are
//! redrawn at most once per `redraw_interval` unless forced.

use crate::config::PlaybackSettings;
use crate::palette::build_speed_segments;
use crate::surface::{
    ChartId, ChartKind, ChartSpec, ChartSurface, Dashboard, MapSurface, MarkerKind, MarkerSpec,
    OverlayId, PolylineStyle, RpmReadout,
};
use lapview_core::timing::format_runtime;
use lapview_core::{
    bounds_of, AnalysisSettings, Drivetrain, GeoBounds, GeoPoint, Lap, LapAnalysis, LapStats,
    TrackPoint,
};
use serde::Serialize;
use tracing::{debug, info, warn};

const POSITION_MARKER_Z: i32 = 100;

/// Values shown for one rendered frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReadout {
    pub index: usize,
    pub position: GeoPoint,
    pub speed: f64,
    pub rpm: Option<f64>,
    pub gear: Option<u8>,
    /// Seconds since the lap's first sample
    pub intra_lap_seconds: f64,
    /// Whether the throttled surfaces (charts, HUD, scrub) were updated
    pub redrawn: bool,
}

/// Everything derived from and drawn for the active lap
struct ActiveLap {
    lap_index: usize,
    track: Vec<TrackPoint>,
    stats: LapStats,
    analysis: LapAnalysis,
    bounds: Option<GeoBounds>,
    polylines: Vec<OverlayId>,
    braking_markers: Vec<OverlayId>,
    acceleration_markers: Vec<OverlayId>,
    position_marker: OverlayId,
    charts: Vec<(ChartKind, ChartId)>,
}

pub struct RenderCoordinator<M, C, D> {
    map: M,
    charts: C,
    dashboard: D,
    settings: PlaybackSettings,
    analysis_settings: AnalysisSettings,
    braking_visible: bool,
    acceleration_visible: bool,
    active: Option<ActiveLap>,
    last_redraw_ms: Option<f64>,
}

impl<M, C, D> RenderCoordinator<M, C, D>
where
    M: MapSurface,
    C: ChartSurface,
    D: Dashboard,
{
    pub fn new(map: M, charts: C, dashboard: D) -> Self {
        Self {
            map,
            charts,
            dashboard,
            settings: PlaybackSettings::default(),
            analysis_settings: AnalysisSettings::default(),
            braking_visible: true,
            acceleration_visible: true,
            active: None,
            last_redraw_ms: None,
        }
    }

    pub fn with_settings(mut self, settings: PlaybackSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_analysis_settings(mut self, settings: AnalysisSettings) -> Self {
        self.analysis_settings = settings;
        self
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.settings
    }

    /// Replace the active lap. Returns `false` (leaving nothing drawn) when
    /// the lap has fewer than two samples.
    pub fn load_lap(
        &mut self,
        lap_index: usize,
        lap: &Lap,
        drivetrain: Option<&Drivetrain>,
        now_ms: f64,
    ) -> bool {
        self.clear();

        if !lap.is_renderable() {
            warn!(
                lap = lap.lap_number,
                samples = lap.track.len(),
                "Lap has too few samples to render"
            );
            return false;
        }

        let track = lap.track.clone();
        let stats = LapStats::of(&track);
        let analysis = LapAnalysis::run(&track, drivetrain, &self.analysis_settings);
        let map_points = lap.map_points();

        // Speed-colored polyline
        let polylines: Vec<OverlayId> = build_speed_segments(
            map_points,
            stats.min_speed.0,
            stats.max_speed.0,
            self.settings.speed_buckets,
        )
        .into_iter()
        .map(|segment| {
            let style = PolylineStyle {
                color: segment.color,
                width: self.settings.polyline_width,
            };
            self.map.draw_polyline(&segment.path, &style)
        })
        .collect();

        let braking_markers = self.place_event_markers(
            &track,
            &analysis.significant.braking,
            MarkerKind::Braking,
            self.braking_visible,
        );
        let acceleration_markers = self.place_event_markers(
            &track,
            &analysis.significant.acceleration,
            MarkerKind::Acceleration,
            self.acceleration_visible,
        );

        let position_marker = self.map.place_marker(&MarkerSpec {
            kind: MarkerKind::Position,
            position: track[0].position(),
            title: None,
            visible: true,
            z_index: POSITION_MARKER_Z,
        });

        let bounds = bounds_of(map_points);
        if let Some(bounds) = bounds {
            self.map.fit_bounds(bounds);
        }

        let charts = self.build_charts(&track, stats.start_time.0, &analysis);
        self.dashboard.set_gear_visible(analysis.has_gears());
        self.dashboard.set_scrub_range(track.len() - 1);

        info!(
            lap = lap.lap_number,
            samples = track.len(),
            segments = polylines.len(),
            braking = braking_markers.len(),
            acceleration = acceleration_markers.len(),
            charts = charts.len(),
            "Lap loaded"
        );

        self.active = Some(ActiveLap {
            lap_index,
            track,
            stats,
            analysis,
            bounds,
            polylines,
            braking_markers,
            acceleration_markers,
            position_marker,
            charts,
        });

        self.render_frame(0, 0.0, now_ms, true);
        true
    }

    fn place_event_markers(
        &mut self,
        track: &[TrackPoint],
        indices: &[usize],
        kind: MarkerKind,
        visible: bool,
    ) -> Vec<OverlayId> {
        indices
            .iter()
            .filter_map(|&i| track.get(i))
            .map(|point| {
                self.map.place_marker(&MarkerSpec {
                    kind,
                    position: point.position(),
                    title: Some(format!("Speed: {:.1} km/h", point.speed.0)),
                    visible,
                    z_index: 0,
                })
            })
            .collect()
    }

    fn build_charts(
        &mut self,
        track: &[TrackPoint],
        lap_start: f64,
        analysis: &LapAnalysis,
    ) -> Vec<(ChartKind, ChartId)> {
        let labels: Vec<String> = track
            .iter()
            .map(|p| format!("{:.2}", p.runtime.0 - lap_start))
            .collect();

        let mut series: Vec<(ChartKind, Vec<Option<f64>>)> = vec![(
            ChartKind::Speed,
            track.iter().map(|p| Some(p.speed.0)).collect(),
        )];
        if track.iter().any(|p| p.rpm.is_some_and(|r| r.0 > 0.0)) {
            series.push((ChartKind::Rpm, track.iter().map(|p| p.rpm.map(|r| r.0)).collect()));
        }
        if track.iter().any(|p| p.throttle.is_some_and(|t| t.0 > 0.0)) {
            series.push((
                ChartKind::Throttle,
                track.iter().map(|p| p.throttle.map(|t| t.0)).collect(),
            ));
        }
        if analysis.has_gears() {
            series.push((
                ChartKind::Gear,
                (0..track.len())
                    .map(|i| analysis.gear_at(i).map(f64::from))
                    .collect(),
            ));
        }

        series
            .into_iter()
            .map(|(kind, values)| {
                let id = self.charts.create_chart(&ChartSpec::for_kind(kind));
                self.charts.set_series(id, &labels, &values);
                self.charts.redraw(id, true);
                (kind, id)
            })
            .collect()
    }

    /// Draw the position `ratio` of the way from sample `index` to `index + 1`
    ///
    /// The position marker is always moved. Charts, HUD and scrub slider are
    /// updated when `force` is set or `redraw_interval` has passed since the
    /// last redraw.
    pub fn render_frame(
        &mut self,
        index: usize,
        ratio: f64,
        now_ms: f64,
        force: bool,
    ) -> Option<FrameReadout> {
        let active = self.active.as_ref()?;
        let last = active.track.len().checked_sub(1)?;
        let index = index.min(last);
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };

        let current = &active.track[index];
        let next = &active.track[(index + 1).min(last)];
        let lerp = |a: f64, b: f64| a + (b - a) * ratio;

        let position = current.position().lerp(&next.position(), ratio);
        let speed = lerp(current.speed.0, next.speed.0);
        let rpm = match (current.rpm, next.rpm) {
            (Some(a), Some(b)) => Some(lerp(a.0, b.0)),
            (a, b) => a.or(b).map(|r| r.0),
        };
        let intra_lap_seconds =
            (lerp(current.runtime.0, next.runtime.0) - active.stats.start_time.0).max(0.0);
        let gear = active.analysis.gear_at(index);
        let has_gears = active.analysis.has_gears();
        let position_marker = active.position_marker;
        let chart_ids: Vec<ChartId> = active.charts.iter().map(|(_, id)| *id).collect();

        self.map.move_marker(position_marker, position);

        let redrawn = force
            || self
                .last_redraw_ms
                .map_or(true, |t| now_ms - t >= self.settings.redraw_interval_ms());
        if redrawn {
            for id in chart_ids {
                self.charts.set_cursor(id, index, true);
                self.charts.redraw(id, false);
            }
            self.dashboard.set_scrub_value(index);
            self.dashboard
                .set_playback_time(&format_runtime(intra_lap_seconds));
            self.dashboard.set_speed(speed);
            self.dashboard.set_rpm(rpm.map(|r| {
                RpmReadout::new(r, self.settings.rpm_reference, self.settings.redline_fraction)
            }));
            if has_gears {
                let label = gear.map_or_else(|| "-".to_string(), |g| g.to_string());
                self.dashboard.set_gear(&label);
            }
            self.last_redraw_ms = Some(now_ms);
        }

        Some(FrameReadout {
            index,
            position,
            speed,
            rpm,
            gear,
            intra_lap_seconds,
            redrawn,
        })
    }

    pub fn set_braking_markers_visible(&mut self, visible: bool) {
        self.braking_visible = visible;
        if let Some(active) = &self.active {
            for id in &active.braking_markers {
                self.map.set_visible(*id, visible);
            }
        }
    }

    pub fn set_acceleration_markers_visible(&mut self, visible: bool) {
        self.acceleration_visible = visible;
        if let Some(active) = &self.active {
            for id in &active.acceleration_markers {
                self.map.set_visible(*id, visible);
            }
        }
    }

    /// Re-layout the map after its container changed size, then re-fit the lap
    pub fn refresh_layout(&mut self) {
        self.map.refresh_layout();
        if let Some(bounds) = self.active.as_ref().and_then(|a| a.bounds) {
            self.map.fit_bounds(bounds);
        }
    }

    /// Dispose every overlay and chart of the active lap
    pub fn clear(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let overlays = active
            .polylines
            .iter()
            .chain(&active.braking_markers)
            .chain(&active.acceleration_markers)
            .chain(std::iter::once(&active.position_marker));
        for id in overlays {
            self.map.remove(*id);
        }
        for (_, id) in &active.charts {
            self.charts.destroy(*id);
        }
        self.last_redraw_ms = None;
        debug!(lap_index = active.lap_index, "Lap disposed");
    }

    /// Live overlays owned for the active lap
    pub fn overlay_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| {
            a.polylines.len() + a.braking_markers.len() + a.acceleration_markers.len() + 1
        })
    }

    pub fn chart_kinds(&self) -> Vec<ChartKind> {
        self.active
            .as_ref()
            .map(|a| a.charts.iter().map(|(kind, _)| *kind).collect())
            .unwrap_or_default()
    }

    pub fn lap_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.lap_index)
    }

    pub fn stats(&self) -> Option<&LapStats> {
        self.active.as_ref().map(|a| &a.stats)
    }

    pub fn analysis(&self) -> Option<&LapAnalysis> {
        self.active.as_ref().map(|a| &a.analysis)
    }

    pub fn segment_count(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.polylines.len())
    }

    /// Sample runtimes of the active lap, for the playback clock
    pub fn runtimes(&self) -> Vec<f64> {
        self.active
            .as_ref()
            .map(|a| a.track.iter().map(|p| p.runtime.0).collect())
            .unwrap_or_default()
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn charts(&self) -> &C {
        &self.charts
    }

    pub fn dashboard(&self) -> &D {
        &self.dashboard
    }
}
