//! Session loading helpers
//!
//! A load is split into `begin` (take a ticket) and `finish` (apply the
//! fetched result). Only the most recently issued ticket may apply its
//! result, so a slow response can never overwrite a newer one.

use crate::error::LoadError;
use crate::surface::LapOption;
use lapview_core::timing::{fastest_lap_index, LapTimeSummary};
use lapview_core::{SessionPayload, SourceError};

/// Proof of which load request a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

/// Request-generation counter
#[derive(Debug, Default)]
pub struct LoadGuard {
    generation: u64,
}

impl LoadGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new ticket, invalidating every earlier one
    pub fn begin(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Invalidate outstanding tickets without issuing a new one
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.generation
    }
}

/// Reject payloads with nothing to show
pub fn check_payload(
    result: Result<SessionPayload, SourceError>,
) -> Result<SessionPayload, LoadError> {
    let payload = result?;
    if !payload.has_data() {
        return Err(LoadError::NoData);
    }
    Ok(payload)
}

/// Lap to show first: the fastest parseable lap, else the first one
pub fn initial_lap(payload: &SessionPayload) -> usize {
    fastest_lap_index(&payload.lap_times)
        .filter(|i| *i < payload.laps.len())
        .unwrap_or(0)
}

/// Lap-selector entries: `👑 Lap 3 (1:58.123)` for the fastest lap,
/// `Lap 4 (1:58.655)` otherwise
pub fn lap_options(payload: &SessionPayload) -> Vec<LapOption> {
    let best = fastest_lap_index(&payload.lap_times);
    let summary = LapTimeSummary::from_lap_times(&payload.lap_times);

    (0..payload.laps.len())
        .map(|index| {
            let time = payload.lap_times.get(index).map(String::as_str).unwrap_or("-");
            let is_best = best == Some(index);
            let crown = if is_best { "👑 " } else { "" };
            let gap = summary
                .as_ref()
                .and_then(|s| s.detail(index))
                .map(|d| d.gap.clone())
                .unwrap_or_default();
            LapOption {
                index,
                label: format!("{}Lap {} ({})", crown, index + 1, time),
                is_best,
                gap,
            }
        })
        .collect()
}
