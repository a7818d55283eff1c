//! Playback clock
//!
//! Maps wall time onto a lap's sample runtimes. While playing, the virtual
//! runtime is `(now - started_at) / 1000 + offset`; each tick locates the
//! bracketing samples `[i, i + 1]` and the interpolation ratio between them.
//! Reaching the final sample's runtime snaps to it and stops.

use serde::Serialize;
use tracing::debug;

/// A position on the active lap: sample index plus progress towards the next sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FramePosition {
    pub index: usize,
    /// In [0, 1]
    pub ratio: f64,
}

impl FramePosition {
    pub fn at(index: usize) -> Self {
        Self { index, ratio: 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Stopped,
    Playing { started_at_ms: f64 },
}

/// Result of one scheduling tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Not playing; nothing to draw
    Idle,
    Frame(FramePosition),
    /// Reached the last sample; the clock is now stopped there
    Finished(FramePosition),
}

/// Snapshot of the viewer's playback state
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlaybackState {
    pub current_lap_index: usize,
    /// Intra-lap elapsed seconds at the current position
    pub virtual_elapsed_seconds: f64,
    pub is_playing: bool,
}

/// `Stopped`/`Playing` state machine over one lap's runtimes
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    runtimes: Vec<f64>,
    status: Status,
    /// Raw runtime playback resumes from
    offset: f64,
    position: FramePosition,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            runtimes: Vec::new(),
            status: Status::Stopped,
            offset: 0.0,
            position: FramePosition::default(),
        }
    }

    /// Reset onto a new lap: stopped at the first sample
    pub fn load(&mut self, runtimes: Vec<f64>) {
        self.offset = runtimes.first().copied().unwrap_or(0.0);
        self.runtimes = runtimes;
        self.status = Status::Stopped;
        self.position = FramePosition::default();
    }

    /// Drop the lap; the clock becomes inert
    pub fn unload(&mut self) {
        self.load(Vec::new());
    }

    pub fn is_loaded(&self) -> bool {
        !self.runtimes.is_empty()
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.status, Status::Playing { .. })
    }

    pub fn position(&self) -> FramePosition {
        self.position
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    fn last_index(&self) -> usize {
        self.runtimes.len().saturating_sub(1)
    }

    /// Interpolated raw runtime at the current position
    pub fn current_runtime(&self) -> f64 {
        let FramePosition { index, ratio } = self.position;
        let Some(&start) = self.runtimes.get(index) else {
            return 0.0;
        };
        match self.runtimes.get(index + 1) {
            Some(&next) => start + (next - start) * ratio,
            None => start,
        }
    }

    /// Seconds since the lap's first sample at the current position
    pub fn intra_lap_elapsed(&self) -> f64 {
        let lap_start = self.runtimes.first().copied().unwrap_or(0.0);
        (self.current_runtime() - lap_start).max(0.0)
    }

    /// Stopped -> Playing. Returns `false` (no-op) when already playing or
    /// when no lap is loaded. Starting from the final sample rewinds first.
    pub fn start(&mut self, now_ms: f64) -> bool {
        if self.is_playing() || !self.is_loaded() {
            return false;
        }
        if self.position.index >= self.last_index() {
            self.position = FramePosition::default();
        }
        self.offset = self.current_runtime();
        self.status = Status::Playing {
            started_at_ms: now_ms,
        };
        debug!(offset = self.offset, "Playback clock started");
        true
    }

    /// Playing -> Stopped, frozen at the position computed for `now_ms`.
    /// Returns `false` when already stopped.
    pub fn stop(&mut self, now_ms: f64) -> bool {
        if !self.is_playing() {
            return false;
        }
        // Bring the position up to date before freezing
        if let Tick::Finished(_) = self.tick(now_ms) {
            return true;
        }
        self.offset = self.current_runtime();
        self.status = Status::Stopped;
        true
    }

    /// Jump to a sample. Valid in either state; playback continues from the
    /// new position when already playing. Returns the clamped index.
    pub fn seek(&mut self, index: usize, now_ms: f64) -> usize {
        if !self.is_loaded() {
            return 0;
        }
        let index = index.min(self.last_index());
        self.position = FramePosition::at(index);
        self.offset = self.runtimes[index];
        if self.is_playing() {
            self.status = Status::Playing {
                started_at_ms: now_ms,
            };
        }
        index
    }

    /// Advance to `now_ms`
    pub fn tick(&mut self, now_ms: f64) -> Tick {
        let Status::Playing { started_at_ms } = self.status else {
            return Tick::Idle;
        };
        let Some(&last_runtime) = self.runtimes.last() else {
            self.status = Status::Stopped;
            return Tick::Idle;
        };

        let elapsed = (now_ms - started_at_ms) / 1000.0 + self.offset;
        if elapsed >= last_runtime {
            self.position = FramePosition::at(self.last_index());
            self.offset = last_runtime;
            self.status = Status::Stopped;
            return Tick::Finished(self.position);
        }

        // Forward search from the last known index; restart if time went backwards
        let mut index = self.position.index.min(self.last_index());
        if elapsed < self.runtimes[index] {
            index = 0;
        }
        while index + 1 < self.runtimes.len() && self.runtimes[index + 1] <= elapsed {
            index += 1;
        }

        let ratio = match self.runtimes.get(index + 1) {
            Some(&next) => {
                let span = next - self.runtimes[index];
                if span > 0.0 {
                    ((elapsed - self.runtimes[index]) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        self.position = FramePosition { index, ratio };
        Tick::Frame(self.position)
    }
}
