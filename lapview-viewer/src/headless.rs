//! In-memory collaborators
//!
//! Record what the viewer asked them to draw, without drawing anything. The
//! CLI runs on these, and tests use them to inspect live objects.

use crate::surface::{
    ChartId, ChartKind, ChartSpec, ChartSurface, ControlPanel, Dashboard, LapOption,
    MapSurface, MarkerKind, MarkerSpec, OverlayId, PolylineStyle, RpmReadout,
};
use lapview_core::{GeoBounds, GeoPoint};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessPolyline {
    pub path: Vec<GeoPoint>,
    pub style: PolylineStyle,
}

#[derive(Debug, Default)]
pub struct HeadlessMap {
    next_id: u64,
    polylines: BTreeMap<OverlayId, HeadlessPolyline>,
    markers: BTreeMap<OverlayId, MarkerSpec>,
    viewport: Option<GeoBounds>,
    fit_count: usize,
    layout_refreshes: usize,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> OverlayId {
        self.next_id += 1;
        OverlayId(self.next_id)
    }

    /// Polylines plus markers currently on the map
    pub fn live_overlays(&self) -> usize {
        self.polylines.len() + self.markers.len()
    }

    pub fn polylines(&self) -> impl Iterator<Item = &HeadlessPolyline> {
        self.polylines.values()
    }

    pub fn markers(&self, kind: MarkerKind) -> impl Iterator<Item = &MarkerSpec> {
        self.markers.values().filter(move |m| m.kind == kind)
    }

    pub fn visible_markers(&self, kind: MarkerKind) -> usize {
        self.markers(kind).filter(|m| m.visible).count()
    }

    pub fn marker_titles(&self, kind: MarkerKind) -> Vec<String> {
        self.markers(kind).filter_map(|m| m.title.clone()).collect()
    }

    /// Position of the first live marker of `kind`
    pub fn marker_position(&self, kind: MarkerKind) -> Option<GeoPoint> {
        self.markers(kind).next().map(|m| m.position)
    }

    pub fn viewport(&self) -> Option<GeoBounds> {
        self.viewport
    }

    pub fn fit_count(&self) -> usize {
        self.fit_count
    }

    pub fn layout_refreshes(&self) -> usize {
        self.layout_refreshes
    }
}

impl MapSurface for HeadlessMap {
    fn draw_polyline(&mut self, path: &[GeoPoint], style: &PolylineStyle) -> OverlayId {
        let id = self.allocate();
        self.polylines.insert(
            id,
            HeadlessPolyline {
                path: path.to_vec(),
                style: style.clone(),
            },
        );
        id
    }

    fn place_marker(&mut self, marker: &MarkerSpec) -> OverlayId {
        let id = self.allocate();
        self.markers.insert(id, marker.clone());
        id
    }

    fn move_marker(&mut self, id: OverlayId, position: GeoPoint) {
        match self.markers.get_mut(&id) {
            Some(marker) => marker.position = position,
            None => warn!(?id, "Move of unknown marker"),
        }
    }

    fn set_visible(&mut self, id: OverlayId, visible: bool) {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.visible = visible;
        }
    }

    fn remove(&mut self, id: OverlayId) {
        if self.polylines.remove(&id).is_none() && self.markers.remove(&id).is_none() {
            warn!(?id, "Removal of unknown overlay");
        }
    }

    fn fit_bounds(&mut self, bounds: GeoBounds) {
        self.viewport = Some(bounds);
        self.fit_count += 1;
    }

    fn refresh_layout(&mut self) {
        self.layout_refreshes += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessChart {
    pub spec: ChartSpec,
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
    pub cursor: Option<usize>,
    pub redraws: usize,
}

#[derive(Debug, Default)]
pub struct HeadlessCharts {
    next_id: u64,
    charts: BTreeMap<ChartId, HeadlessChart>,
}

impl HeadlessCharts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_charts(&self) -> usize {
        self.charts.len()
    }

    pub fn chart(&self, kind: ChartKind) -> Option<&HeadlessChart> {
        self.charts.values().find(|c| c.spec.kind == kind)
    }

    /// Visible cursor position of the chart of `kind`
    pub fn cursor(&self, kind: ChartKind) -> Option<usize> {
        self.chart(kind).and_then(|c| c.cursor)
    }
}

impl ChartSurface for HeadlessCharts {
    fn create_chart(&mut self, spec: &ChartSpec) -> ChartId {
        self.next_id += 1;
        let id = ChartId(self.next_id);
        self.charts.insert(
            id,
            HeadlessChart {
                spec: spec.clone(),
                labels: Vec::new(),
                values: Vec::new(),
                cursor: None,
                redraws: 0,
            },
        );
        debug!(?id, kind = ?spec.kind, "Chart created");
        id
    }

    fn set_series(&mut self, id: ChartId, labels: &[String], values: &[Option<f64>]) {
        if let Some(chart) = self.charts.get_mut(&id) {
            chart.labels = labels.to_vec();
            chart.values = values.to_vec();
        }
    }

    fn set_cursor(&mut self, id: ChartId, x: usize, visible: bool) {
        if let Some(chart) = self.charts.get_mut(&id) {
            chart.cursor = visible.then_some(x);
        }
    }

    fn redraw(&mut self, id: ChartId, _animate: bool) {
        if let Some(chart) = self.charts.get_mut(&id) {
            chart.redraws += 1;
        }
    }

    fn destroy(&mut self, id: ChartId) {
        if self.charts.remove(&id).is_none() {
            warn!(?id, "Destroy of unknown chart");
        }
    }
}

/// Last value written to each HUD element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessDashboard {
    pub scrub_max: Option<usize>,
    pub scrub_value: Option<usize>,
    pub playback_time: String,
    pub speed: Option<f64>,
    pub rpm: Option<RpmReadout>,
    pub gear: String,
    pub gear_visible: bool,
}

impl HeadlessDashboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dashboard for HeadlessDashboard {
    fn set_scrub_range(&mut self, max: usize) {
        self.scrub_max = Some(max);
    }

    fn set_scrub_value(&mut self, index: usize) {
        self.scrub_value = Some(index);
    }

    fn set_playback_time(&mut self, text: &str) {
        self.playback_time = text.to_string();
    }

    fn set_speed(&mut self, kmh: f64) {
        self.speed = Some(kmh);
    }

    fn set_rpm(&mut self, readout: Option<RpmReadout>) {
        self.rpm = readout;
    }

    fn set_gear(&mut self, gear: &str) {
        self.gear = gear.to_string();
    }

    fn set_gear_visible(&mut self, visible: bool) {
        self.gear_visible = visible;
    }
}

/// What the status area around the map currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
    NoData,
    Ready,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessPanel {
    pub status: PanelStatus,
    pub session_name: String,
    pub lap_options: Vec<LapOption>,
    pub selected: Option<usize>,
    pub playing: bool,
    pub telemetry_visible: bool,
}

impl HeadlessPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.lap_options.iter().map(|o| o.label.as_str()).collect()
    }
}

impl ControlPanel for HeadlessPanel {
    fn show_loading(&mut self) {
        self.status = PanelStatus::Loading;
        self.lap_options.clear();
        self.selected = None;
    }

    fn show_error(&mut self, message: &str) {
        self.status = PanelStatus::Error(message.to_string());
    }

    fn show_no_data(&mut self) {
        self.status = PanelStatus::NoData;
    }

    fn set_session_name(&mut self, name: &str) {
        self.session_name = name.to_string();
    }

    fn set_lap_options(&mut self, options: &[LapOption], selected: usize) {
        self.status = PanelStatus::Ready;
        self.lap_options = options.to_vec();
        self.selected = Some(selected);
    }

    fn set_selected_lap(&mut self, index: usize) {
        self.selected = Some(index);
    }

    fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
    }

    fn set_telemetry_panel(&mut self, visible: bool) {
        self.telemetry_visible = visible;
    }
}
