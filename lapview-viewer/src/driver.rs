//! Frame-loop driver
//!
//! Calls [`ViewerSession::on_frame`] once per scheduler tick while the
//! session is playing. A spawned loop holds a lease on its session; starting
//! a new loop cancels the previous lease, so at most one loop draws frames.
//! A loop ends when playback finishes or stops, or when its token fires.

use crate::playback::Tick;
use crate::session::ViewerSession;
use crate::surface::{ChartSurface, ControlPanel, Dashboard, MapSurface};
use crate::time::Clock;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// Source of "next frame" wake-ups
#[async_trait]
pub trait FrameScheduler: Send {
    /// Yield until the next frame is due
    async fn next_frame(&mut self);
}

/// Fixed-period scheduler on the tokio timer
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        // A late frame is dropped, never replayed in a burst
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl FrameScheduler for IntervalScheduler {
    async fn next_frame(&mut self) {
        self.interval.tick().await;
    }
}

/// Why a frame loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Reached the end of the lap
    Finished,
    /// Playback was stopped by someone else (pause, lap change, close)
    Stopped,
    /// The cancellation token fired; playback was paused
    Cancelled,
}

/// Drive `session` until playback ends or `cancel` fires
pub async fn run_frame_loop<M, C, D, P, K, S>(
    session: &mut ViewerSession<M, C, D, P, K>,
    scheduler: &mut S,
    cancel: &CancellationToken,
) -> LoopExit
where
    M: MapSurface,
    C: ChartSurface,
    D: Dashboard,
    P: ControlPanel,
    K: Clock,
    S: FrameScheduler,
{
    debug!("Frame loop started");
    let mut frames: u64 = 0;

    let exit = loop {
        if !session.is_playing() {
            break LoopExit::Stopped;
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                session.pause();
                break LoopExit::Cancelled;
            }
            _ = scheduler.next_frame() => {}
        }
        frames += 1;
        match session.on_frame() {
            Tick::Frame(_) => continue,
            Tick::Finished(_) => break LoopExit::Finished,
            Tick::Idle => break LoopExit::Stopped,
        }
    };

    debug!(frames, ?exit, "Frame loop ended");
    exit
}

/// A frame loop running on its own task against a shared session
///
/// Dropping the task cancels the loop, which pauses playback.
pub struct PlaybackTask {
    cancel: CancellationToken,
    handle: JoinHandle<LoopExit>,
    _cancel_on_drop: DropGuard,
}

impl PlaybackTask {
    /// Stop the loop (pausing playback) and wait for it
    pub async fn stop(self) -> LoopExit {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the loop to end on its own
    pub async fn join(self) -> LoopExit {
        // A panicked loop leaves playback in an unknown state; report it as stopped
        self.handle.await.unwrap_or(LoopExit::Stopped)
    }

    /// Token that stops the loop when cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Start playback on `session` and spawn a frame loop for it
///
/// Returns `None` when there is nothing to play, or when playback was already
/// running under another loop. A loop that is still winding down after a
/// pause is replaced by the new one.
///
/// The session lock is taken once per frame, so controls can interleave
/// with the loop.
pub async fn spawn_playback<M, C, D, P, K>(
    session: Arc<Mutex<ViewerSession<M, C, D, P, K>>>,
    frame_interval: Duration,
) -> Option<PlaybackTask>
where
    M: MapSurface + Send + 'static,
    C: ChartSurface + Send + 'static,
    D: Dashboard + Send + 'static,
    P: ControlPanel + Send + 'static,
    K: Clock + 'static,
{
    let cancel = CancellationToken::new();
    let lease = {
        let mut guard = session.lock().await;
        let started = guard.play();
        if !guard.is_playing() || (!started && guard.has_frame_loop()) {
            debug!(started, "Playback not spawned");
            return None;
        }
        guard.lease_frame_loop(cancel.clone())
    };
    let token = cancel.clone();

    let handle = tokio::spawn(async move {
        info!(?lease, "Playback task started");
        let mut scheduler = IntervalScheduler::new(frame_interval);

        let exit = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    let mut session = session.lock().await;
                    if session.holds_frame_loop(lease) {
                        session.pause();
                        session.release_frame_loop(lease);
                    }
                    break LoopExit::Cancelled;
                }
                _ = scheduler.next_frame() => {}
            }

            let mut session = session.lock().await;
            if !session.holds_frame_loop(lease) {
                break LoopExit::Stopped;
            }
            if !session.is_playing() {
                session.release_frame_loop(lease);
                break LoopExit::Stopped;
            }
            match session.on_frame() {
                Tick::Frame(_) => {}
                Tick::Finished(_) => {
                    session.release_frame_loop(lease);
                    break LoopExit::Finished;
                }
                Tick::Idle => {
                    session.release_frame_loop(lease);
                    break LoopExit::Stopped;
                }
            }
        };

        info!(?exit, "Playback task ended");
        exit
    });

    Some(PlaybackTask {
        _cancel_on_drop: cancel.clone().drop_guard(),
        cancel,
        handle,
    })
}
