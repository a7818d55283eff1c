//! Lapview
//!
//! Headless lap viewer: loads a session, reports the lap analysis and can
//! replay a lap in real time against the in-memory collaborators.

use anyhow::{bail, Context, Result};
use clap::Parser;
use lapview_core::timing::format_runtime;
use lapview_core::LapDataSource;
use lapview_sources::{DemoSource, FileSource, HttpSource};
use lapview_viewer::{
    spawn_playback, Clock, HeadlessSession, LoadError, LoadOutcome, PlaybackSettings,
    TokioClock, ViewerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "lapview", version, about = "Replay and analyze recorded laps")]
struct Args {
    /// Fetch the session payload from this URL
    #[arg(long, conflicts_with_all = ["file", "demo"])]
    data_url: Option<String>,

    /// Read the session payload from a JSON file
    #[arg(long, conflicts_with = "demo")]
    file: Option<PathBuf>,

    /// Use a generated demo session
    #[arg(long)]
    demo: bool,

    /// Number of laps in the demo session
    #[arg(long, default_value_t = 3)]
    demo_laps: usize,

    /// Lap to show (1-based); defaults to the fastest lap
    #[arg(long)]
    lap: Option<usize>,

    #[arg(long, default_value = "local")]
    session_id: String,

    #[arg(long, default_value = "")]
    session_name: String,

    /// Number of colors in the speed polyline
    #[arg(long, default_value_t = 20)]
    speed_buckets: usize,

    /// Replay the selected lap in real time
    #[arg(long)]
    play: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let source: Box<dyn LapDataSource> = match (&args.data_url, &args.file, args.demo) {
        (Some(url), _, _) => Box::new(HttpSource::new(url.clone())),
        (None, Some(path), _) => Box::new(FileSource::new(path)),
        (None, None, true) => Box::new(DemoSource::new().with_laps(args.demo_laps)),
        (None, None, false) => bail!("one of --data-url, --file or --demo is required"),
    };

    let config = ViewerConfig::new(
        args.session_id.clone(),
        args.data_url.clone().unwrap_or_else(|| source.describe()),
    )
    .with_session_name(args.session_name.clone());
    config.validate().context("invalid viewer configuration")?;

    let settings = PlaybackSettings {
        speed_buckets: args.speed_buckets,
        ..PlaybackSettings::default()
    };

    info!("Starting Lapview ({})", source.describe());
    let mut session = HeadlessSession::headless(config, TokioClock::new()).with_settings(settings);

    match session.load_from(source.as_ref()).await {
        LoadOutcome::Ready(_) => {}
        LoadOutcome::Failed(LoadError::NoData) => {
            warn!("Session has no lap data");
            return Ok(());
        }
        LoadOutcome::Failed(e) => return Err(e.into()),
        LoadOutcome::Stale => bail!("lap data response was superseded"),
    }

    if let Some(lap) = args.lap {
        let index = lap.checked_sub(1).context("--lap is 1-based")?;
        if !session.select_lap(index) {
            bail!("lap {} cannot be shown", lap);
        }
    }

    report(&session);

    if args.play {
        let frame_interval = settings.frame_interval;
        let session = Arc::new(Mutex::new(session));
        let Some(task) = spawn_playback(session.clone(), frame_interval).await else {
            warn!("Selected lap cannot be played");
            return Ok(());
        };

        let cancel = task.cancel_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
                cancel.cancel();
            }
        });
        let exit = task.join().await;

        let session = session.lock().await;
        if let Some(state) = session.state() {
            info!(
                lap = state.current_lap_index + 1,
                elapsed = %format_runtime(state.virtual_elapsed_seconds),
                ?exit,
                "Playback ended"
            );
        }
    }

    Ok(())
}

fn report<K: Clock>(session: &HeadlessSession<K>) {
    for option in session.lap_options() {
        let marker = if Some(option.index) == session.current_lap() { ">" } else { " " };
        info!("{} {} {}", marker, option.label, option.gap);
    }

    let coordinator = session.coordinator();
    if let (Some(stats), Some(analysis)) = (coordinator.stats(), coordinator.analysis()) {
        info!(
            min_speed = stats.min_speed.0,
            max_speed = stats.max_speed.0,
            duration = %format_runtime(stats.duration.0),
            braking = analysis.significant.braking.len(),
            acceleration = analysis.significant.acceleration.len(),
            gears = analysis.has_gears(),
            segments = coordinator.segment_count(),
            charts = ?coordinator.chart_kinds(),
            "Lap summary"
        );
    }
}
