//! Viewer session
//!
//! One `ViewerSession` exists per viewer activation. It owns the loaded
//! payload, the playback clock and the render coordinator, and turns control
//! events (lap selection, scrubbing, play/pause, toggles) into calls on them.

use crate::config::{PlaybackSettings, ViewerConfig};
use crate::error::LoadError;
use crate::loader::{check_payload, initial_lap, lap_options, LoadGuard, LoadTicket};
use crate::playback::{PlaybackClock, PlaybackState, Tick};
use crate::render::{FrameReadout, RenderCoordinator};
use crate::surface::{ChartSurface, ControlPanel, Dashboard, LapOption, MapSurface};
use crate::time::Clock;
use lapview_core::{AnalysisSettings, Drivetrain, LapDataSource, SessionPayload, SourceError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Ready,
    NoData,
    Failed(String),
    Closed,
}

/// Result of applying a fetched payload
#[derive(Debug)]
pub enum LoadOutcome {
    /// Payload applied; the given lap is active
    Ready(usize),
    /// A newer load was started after this one; the result was dropped
    Stale,
    Failed(LoadError),
}

/// Input from the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    SelectLap(usize),
    Scrub(usize),
    TogglePlayback,
    Play,
    Pause,
    ShowBrakingMarkers(bool),
    ShowAccelerationMarkers(bool),
    ToggleTelemetryPanel,
}

/// Claim on driving a session's frames; only the newest claim is honored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLease(u64);

/// The rendering collaborators a session drives
pub struct Surfaces<M, C, D, P> {
    pub map: M,
    pub charts: C,
    pub dashboard: D,
    pub panel: P,
}

pub struct ViewerSession<M, C, D, P, K> {
    config: ViewerConfig,
    coordinator: RenderCoordinator<M, C, D>,
    panel: P,
    clock: K,
    playback: PlaybackClock,
    guard: LoadGuard,
    phase: SessionPhase,
    payload: Option<SessionPayload>,
    drivetrain: Option<Drivetrain>,
    options: Vec<LapOption>,
    current_lap: Option<usize>,
    telemetry_visible: bool,
    loop_generation: u64,
    frame_loop: Option<CancellationToken>,
}

impl<M, C, D, P, K> ViewerSession<M, C, D, P, K>
where
    M: MapSurface,
    C: ChartSurface,
    D: Dashboard,
    P: ControlPanel,
    K: Clock,
{
    pub fn new(config: ViewerConfig, surfaces: Surfaces<M, C, D, P>, clock: K) -> Self {
        let Surfaces {
            map,
            charts,
            dashboard,
            panel,
        } = surfaces;
        Self {
            config,
            coordinator: RenderCoordinator::new(map, charts, dashboard),
            panel,
            clock,
            playback: PlaybackClock::new(),
            guard: LoadGuard::new(),
            phase: SessionPhase::Idle,
            payload: None,
            drivetrain: None,
            options: Vec::new(),
            current_lap: None,
            telemetry_visible: true,
            loop_generation: 0,
            frame_loop: None,
        }
    }

    pub fn with_settings(mut self, settings: PlaybackSettings) -> Self {
        self.coordinator = self.coordinator.with_settings(settings);
        self
    }

    pub fn with_analysis_settings(mut self, settings: AnalysisSettings) -> Self {
        self.coordinator = self.coordinator.with_analysis_settings(settings);
        self
    }

    // === Loading ===

    /// Start a load: show the loading state and take a ticket for the result
    pub fn begin_load(&mut self) -> LoadTicket {
        self.pause();
        let ticket = self.guard.begin();
        self.phase = SessionPhase::Loading;
        self.panel.set_session_name(&self.config.session_name);
        self.panel.show_loading();
        debug!(?ticket, session = %self.config.session_id, "Load started");
        ticket
    }

    /// Apply a fetched result, unless a newer load has been started since
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<SessionPayload, SourceError>,
    ) -> LoadOutcome {
        if !self.guard.is_current(ticket) {
            warn!(?ticket, "Discarding stale lap data response");
            return LoadOutcome::Stale;
        }

        let payload = match check_payload(result) {
            Ok(payload) => payload,
            Err(LoadError::NoData) => {
                info!(session = %self.config.session_id, "Session has no lap data");
                self.reset_lap_state();
                self.phase = SessionPhase::NoData;
                self.panel.show_no_data();
                return LoadOutcome::Failed(LoadError::NoData);
            }
            Err(e) => {
                error!(session = %self.config.session_id, "Failed to load lap data: {}", e);
                self.reset_lap_state();
                self.phase = SessionPhase::Failed(e.to_string());
                self.panel.show_error(&e.to_string());
                return LoadOutcome::Failed(e);
            }
        };

        self.drivetrain = payload.drivetrain();
        self.options = lap_options(&payload);
        let first = initial_lap(&payload);
        info!(
            laps = payload.laps.len(),
            gear_estimation = self.drivetrain.is_some(),
            initial_lap = first,
            "Lap data loaded"
        );

        self.payload = Some(payload);
        self.phase = SessionPhase::Ready;
        self.panel.set_lap_options(&self.options, first);
        self.select_lap(first);
        LoadOutcome::Ready(first)
    }

    /// Fetch from `source` and apply the result
    pub async fn load_from(&mut self, source: &dyn LapDataSource) -> LoadOutcome {
        let ticket = self.begin_load();
        info!("Fetching lap data from {}", source.describe());
        let result = source.fetch().await;
        self.finish_load(ticket, result)
    }

    fn reset_lap_state(&mut self) {
        self.coordinator.clear();
        self.playback.unload();
        self.payload = None;
        self.drivetrain = None;
        self.options.clear();
        self.current_lap = None;
    }

    // === Controls ===

    /// Dispatch a control event; ignored unless the session is ready
    pub fn handle(&mut self, event: ControlEvent) {
        if self.phase != SessionPhase::Ready {
            debug!(?event, phase = ?self.phase, "Control ignored");
            return;
        }
        match event {
            ControlEvent::SelectLap(index) => {
                self.select_lap(index);
            }
            ControlEvent::Scrub(index) => {
                self.scrub(index);
            }
            ControlEvent::TogglePlayback => self.toggle_playback(),
            ControlEvent::Play => {
                self.play();
            }
            ControlEvent::Pause => {
                self.pause();
            }
            ControlEvent::ShowBrakingMarkers(visible) => {
                self.coordinator.set_braking_markers_visible(visible)
            }
            ControlEvent::ShowAccelerationMarkers(visible) => {
                self.coordinator.set_acceleration_markers_visible(visible)
            }
            ControlEvent::ToggleTelemetryPanel => {
                self.toggle_telemetry_panel();
            }
        }
    }

    /// Make lap `index` active. Playback stops first. Returns `false` for an
    /// unknown or unrenderable lap.
    pub fn select_lap(&mut self, index: usize) -> bool {
        self.pause();

        let Some(lap) = self.payload.as_ref().and_then(|p| p.laps.get(index)) else {
            warn!(index, "No such lap");
            return false;
        };

        let now = self.clock.now_ms();
        let loaded = self
            .coordinator
            .load_lap(index, lap, self.drivetrain.as_ref(), now);
        self.current_lap = Some(index);
        self.panel.set_selected_lap(index);
        self.playback.load(self.coordinator.runtimes());
        loaded
    }

    /// Move playback to sample `index` and draw it
    pub fn scrub(&mut self, index: usize) -> Option<FrameReadout> {
        let now = self.clock.now_ms();
        let index = self.playback.seek(index, now);
        self.coordinator.render_frame(index, 0.0, now, true)
    }

    /// Returns `true` if playback started
    pub fn play(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.playback.start(now) {
            return false;
        }
        let position = self.playback.position();
        self.coordinator
            .render_frame(position.index, position.ratio, now, true);
        self.panel.set_playing(true);
        info!(lap = ?self.current_lap, index = position.index, "Playback started");
        true
    }

    /// Returns `true` if playback was running
    pub fn pause(&mut self) -> bool {
        let now = self.clock.now_ms();
        if !self.playback.stop(now) {
            return false;
        }
        let position = self.playback.position();
        self.coordinator
            .render_frame(position.index, position.ratio, now, true);
        self.panel.set_playing(false);
        info!(lap = ?self.current_lap, index = position.index, "Playback stopped");
        true
    }

    pub fn toggle_playback(&mut self) {
        if self.playback.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    pub fn set_braking_markers_visible(&mut self, visible: bool) {
        self.coordinator.set_braking_markers_visible(visible);
    }

    pub fn set_acceleration_markers_visible(&mut self, visible: bool) {
        self.coordinator.set_acceleration_markers_visible(visible);
    }

    /// Show/hide the telemetry panel. Public pages have no panel toggle and
    /// return `None`.
    pub fn toggle_telemetry_panel(&mut self) -> Option<bool> {
        if self.config.is_public_page {
            return None;
        }
        self.telemetry_visible = !self.telemetry_visible;
        self.panel.set_telemetry_panel(self.telemetry_visible);
        self.coordinator.refresh_layout();
        Some(self.telemetry_visible)
    }

    /// Advance playback to the current time and draw the frame
    pub fn on_frame(&mut self) -> Tick {
        let now = self.clock.now_ms();
        let tick = self.playback.tick(now);
        match tick {
            Tick::Idle => {}
            Tick::Frame(position) => {
                self.coordinator
                    .render_frame(position.index, position.ratio, now, false);
            }
            Tick::Finished(position) => {
                self.coordinator
                    .render_frame(position.index, position.ratio, now, true);
                self.panel.set_playing(false);
                info!(lap = ?self.current_lap, "Playback finished");
            }
        }
        tick
    }

    // === Frame loop ownership ===

    /// Register the loop that will drive frames, cancelling the one it replaces
    pub(crate) fn lease_frame_loop(&mut self, cancel: CancellationToken) -> LoopLease {
        if let Some(previous) = self.frame_loop.replace(cancel) {
            debug!(generation = self.loop_generation, "Frame loop superseded");
            previous.cancel();
        }
        self.loop_generation += 1;
        LoopLease(self.loop_generation)
    }

    pub(crate) fn holds_frame_loop(&self, lease: LoopLease) -> bool {
        self.frame_loop.is_some() && self.loop_generation == lease.0
    }

    pub(crate) fn release_frame_loop(&mut self, lease: LoopLease) {
        if self.holds_frame_loop(lease) {
            self.frame_loop = None;
        }
    }

    /// Whether a spawned loop is currently driving this session
    pub fn has_frame_loop(&self) -> bool {
        self.frame_loop.is_some()
    }

    /// Stop playback and dispose everything; late load results are ignored
    pub fn close(&mut self) {
        self.pause();
        if let Some(frame_loop) = self.frame_loop.take() {
            frame_loop.cancel();
        }
        self.guard.invalidate();
        self.reset_lap_state();
        self.phase = SessionPhase::Closed;
        info!(session = %self.config.session_id, "Viewer closed");
    }

    // === Accessors ===

    pub fn state(&self) -> Option<PlaybackState> {
        let current_lap_index = self.current_lap?;
        Some(PlaybackState {
            current_lap_index,
            virtual_elapsed_seconds: self.playback.intra_lap_elapsed(),
            is_playing: self.playback.is_playing(),
        })
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn payload(&self) -> Option<&SessionPayload> {
        self.payload.as_ref()
    }

    pub fn lap_options(&self) -> &[LapOption] {
        &self.options
    }

    pub fn current_lap(&self) -> Option<usize> {
        self.current_lap
    }

    pub fn playback(&self) -> &PlaybackClock {
        &self.playback
    }

    pub fn coordinator(&self) -> &RenderCoordinator<M, C, D> {
        &self.coordinator
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }
}
