//! Rendering collaborators
//!
//! The viewer never draws anything itself. It drives a map, a set of charts,
//! a HUD/dashboard and a control panel through these traits, and owns the
//! handles they return.

use lapview_core::{GeoBounds, GeoPoint};
use serde::Serialize;

/// Handle to a map overlay (polyline or marker)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct OverlayId(pub u64);

/// Handle to a chart instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ChartId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolylineStyle {
    pub color: String,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Braking,
    Acceleration,
    /// Live playback position
    Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub kind: MarkerKind,
    pub position: GeoPoint,
    /// Hover text
    pub title: Option<String>,
    pub visible: bool,
    pub z_index: i32,
}

/// Map-rendering collaborator
pub trait MapSurface {
    fn draw_polyline(&mut self, path: &[GeoPoint], style: &PolylineStyle) -> OverlayId;
    fn place_marker(&mut self, marker: &MarkerSpec) -> OverlayId;
    fn move_marker(&mut self, id: OverlayId, position: GeoPoint);
    fn set_visible(&mut self, id: OverlayId, visible: bool);
    fn remove(&mut self, id: OverlayId);
    fn fit_bounds(&mut self, bounds: GeoBounds);
    /// Container size changed; re-layout (resize + recenter)
    fn refresh_layout(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Speed,
    Rpm,
    Throttle,
    Gear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub label: String,
    pub color: String,
    /// Step (staircase) line instead of a straight line
    pub stepped: bool,
    pub y_min: Option<f64>,
}

impl ChartSpec {
    pub fn for_kind(kind: ChartKind) -> Self {
        let (label, color, stepped, y_min) = match kind {
            ChartKind::Speed => ("Speed (km/h)", "rgba(54, 162, 235, 1)", false, Some(0.0)),
            ChartKind::Rpm => ("Engine speed (rpm)", "rgba(255, 99, 132, 1)", false, Some(0.0)),
            ChartKind::Throttle => ("Throttle (%)", "rgba(75, 192, 192, 1)", false, Some(0.0)),
            ChartKind::Gear => ("Gear", "rgba(255, 159, 64, 1)", true, Some(1.0)),
        };
        Self {
            kind,
            label: label.to_string(),
            color: color.to_string(),
            stepped,
            y_min,
        }
    }
}

/// Charting collaborator
pub trait ChartSurface {
    fn create_chart(&mut self, spec: &ChartSpec) -> ChartId;
    fn set_series(&mut self, id: ChartId, labels: &[String], values: &[Option<f64>]);
    /// Vertical cursor annotation at sample `x`
    fn set_cursor(&mut self, id: ChartId, x: usize, visible: bool);
    fn redraw(&mut self, id: ChartId, animate: bool);
    fn destroy(&mut self, id: ChartId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RpmZone {
    /// Below the redline fraction (drawn yellow)
    Caution,
    /// At or above the redline fraction (drawn red)
    Redline,
}

/// Rpm gauge value against a fixed reference scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RpmReadout {
    pub rpm: f64,
    /// `rpm / reference`, clamped to [0, 1]
    pub fraction: f64,
    pub zone: RpmZone,
}

impl RpmReadout {
    pub fn new(rpm: f64, reference: f64, redline_fraction: f64) -> Self {
        let fraction = if reference > 0.0 {
            (rpm / reference).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let zone = if fraction >= redline_fraction {
            RpmZone::Redline
        } else {
            RpmZone::Caution
        };
        Self {
            rpm,
            fraction,
            zone,
        }
    }
}

/// HUD readouts and the scrub slider
pub trait Dashboard {
    /// Slider spans `0..=max`
    fn set_scrub_range(&mut self, max: usize);
    fn set_scrub_value(&mut self, index: usize);
    fn set_playback_time(&mut self, text: &str);
    fn set_speed(&mut self, kmh: f64);
    fn set_rpm(&mut self, readout: Option<RpmReadout>);
    /// Gear number, or "-" when there is no estimate
    fn set_gear(&mut self, gear: &str);
    fn set_gear_visible(&mut self, visible: bool);
}

/// One entry of the lap selector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapOption {
    pub index: usize,
    pub label: String,
    pub is_best: bool,
    /// `+0.532 (2nd)`, empty for the best lap or an unparseable time
    pub gap: String,
}

/// Selector, status area and buttons around the map
pub trait ControlPanel {
    fn show_loading(&mut self);
    fn show_error(&mut self, message: &str);
    fn show_no_data(&mut self);
    fn set_session_name(&mut self, name: &str);
    fn set_lap_options(&mut self, options: &[LapOption], selected: usize);
    fn set_selected_lap(&mut self, index: usize);
    fn set_playing(&mut self, playing: bool);
    fn set_telemetry_panel(&mut self, visible: bool);
}
