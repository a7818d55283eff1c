//! Lapview Viewer
//!
//! Playback and rendering engine of the lap viewer: the playback clock, the
//! render coordinator that drives map/chart/HUD collaborators, the session
//! loader and the tokio frame loop. Headless collaborators are included for
//! the CLI and for tests.

pub mod config;
pub mod driver;
pub mod error;
pub mod headless;
pub mod loader;
pub mod palette;
pub mod playback;
pub mod render;
pub mod session;
pub mod surface;
pub mod time;

pub use config::{ConfigError, PlaybackSettings, ViewerConfig};
pub use driver::{
    run_frame_loop, spawn_playback, FrameScheduler, IntervalScheduler, LoopExit, PlaybackTask,
};
pub use error::LoadError;
pub use playback::{FramePosition, PlaybackClock, PlaybackState, Tick};
pub use render::{FrameReadout, RenderCoordinator};
pub use session::{ControlEvent, LoadOutcome, LoopLease, SessionPhase, Surfaces, ViewerSession};
pub use time::{Clock, ManualClock, SystemClock, TokioClock};

use headless::{HeadlessCharts, HeadlessDashboard, HeadlessMap, HeadlessPanel};

/// A session wired to the in-memory collaborators
pub type HeadlessSession<K> =
    ViewerSession<HeadlessMap, HeadlessCharts, HeadlessDashboard, HeadlessPanel, K>;

impl<K: Clock> HeadlessSession<K> {
    pub fn headless(config: ViewerConfig, clock: K) -> Self {
        ViewerSession::new(
            config,
            Surfaces {
                map: HeadlessMap::new(),
                charts: HeadlessCharts::new(),
                dashboard: HeadlessDashboard::new(),
                panel: HeadlessPanel::new(),
            },
            clock,
        )
    }
}
