//! Lap-time parsing and formatting
//!
//! Lap times arrive as strings in `M:SS.fff` or `SS.fff` form (some loggers
//! write `M'SS.fff`). Playback readouts use a zero-padded `MM:SS.mmm` clock.

use serde::Serialize;

/// Parse a lap-time string into seconds
///
/// Returns `None` for empty, malformed, negative or non-finite input.
pub fn parse_lap_time(time: &str) -> Option<f64> {
    let normalized = time.trim().replace('\'', ":");
    if normalized.is_empty() {
        return None;
    }

    let seconds = match normalized.split(':').collect::<Vec<_>>().as_slice() {
        [minutes, seconds] => {
            let minutes: f64 = minutes.trim().parse().ok()?;
            let seconds: f64 = seconds.trim().parse().ok()?;
            minutes * 60.0 + seconds
        }
        [seconds] => seconds.trim().parse().ok()?,
        _ => return None,
    };

    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}

/// Sort key for lap-time strings: unparseable entries sort as `+inf`
pub fn lap_time_sort_key(time: &str) -> f64 {
    parse_lap_time(time).unwrap_or(f64::INFINITY)
}

/// Index of the fastest lap; the first one wins on ties
///
/// `None` when no entry parses.
pub fn fastest_lap_index<S: AsRef<str>>(lap_times: &[S]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, time) in lap_times.iter().enumerate() {
        let secs = lap_time_sort_key(time.as_ref());
        if secs < best.map(|(_, b)| b).unwrap_or(f64::INFINITY) {
            best = Some((i, secs));
        }
    }
    best.map(|(i, _)| i)
}

/// Format an intra-lap elapsed time as `MM:SS.mmm`
///
/// Negative and NaN inputs render as zero.
pub fn format_runtime(total_seconds: f64) -> String {
    let total_seconds = if total_seconds.is_nan() || total_seconds < 0.0 {
        0.0
    } else {
        total_seconds
    };
    // Nudge before flooring so 1.001 does not print as 1.000
    let total_ms = (total_seconds * 1000.0 + 1e-6).floor() as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
}

/// Format a lap time as `M:SS.fff`
pub fn format_lap_time(total_seconds: f64) -> String {
    let total_ms = (total_seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let rem_ms = total_ms % 60_000;
    format!("{}:{:02}.{:03}", minutes, rem_ms / 1000, rem_ms % 1000)
}

/// English ordinal suffix for a finishing rank
pub fn rank_suffix(rank: usize) -> &'static str {
    if rank == 0 {
        return "";
    }
    if (11..=13).contains(&(rank % 100)) {
        return "th";
    }
    match rank % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Per-lap line of a [`LapTimeSummary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapTimeDetail {
    /// Zero-based index into the session's laps
    pub index: usize,
    pub seconds: f64,
    pub rank: usize,
    pub is_best: bool,
    /// `+0.532 (2nd)` for laps slower than the best, empty for the best lap
    pub gap: String,
}

/// Best/average lap time and gaps for a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapTimeSummary {
    pub best: f64,
    pub average: f64,
    /// Valid laps in recording order
    pub laps: Vec<LapTimeDetail>,
}

impl LapTimeSummary {
    /// Summarize the valid (parseable, non-zero) lap times; `None` if there are none
    pub fn from_lap_times<S: AsRef<str>>(lap_times: &[S]) -> Option<Self> {
        let valid: Vec<(usize, f64)> = lap_times
            .iter()
            .enumerate()
            .filter_map(|(i, t)| parse_lap_time(t.as_ref()).map(|s| (i, s)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        if valid.is_empty() {
            return None;
        }

        let best = valid.iter().map(|(_, s)| *s).fold(f64::INFINITY, f64::min);
        let average = valid.iter().map(|(_, s)| *s).sum::<f64>() / valid.len() as f64;

        let mut by_time = valid.clone();
        by_time.sort_by(|a, b| a.1.total_cmp(&b.1));

        let laps = valid
            .iter()
            .map(|&(index, seconds)| {
                let rank = by_time
                    .iter()
                    .position(|(i, _)| *i == index)
                    .map(|p| p + 1)
                    .unwrap_or(0);
                let is_best = seconds == best;
                let gap = if is_best {
                    String::new()
                } else {
                    format!("+{:.3} ({}{})", seconds - best, rank, rank_suffix(rank))
                };
                LapTimeDetail {
                    index,
                    seconds,
                    rank,
                    is_best,
                    gap,
                }
            })
            .collect();

        Some(Self {
            best,
            average,
            laps,
        })
    }

    pub fn detail(&self, index: usize) -> Option<&LapTimeDetail> {
        self.laps.iter().find(|d| d.index == index)
    }
}
