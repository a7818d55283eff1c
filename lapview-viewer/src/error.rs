use lapview_core::SourceError;
use thiserror::Error;

/// Why a session payload could not be shown
#[derive(Debug, Error)]
pub enum LoadError {
    /// Network, status or decode failure; rendered as an inline error
    #[error("failed to load lap data: {0}")]
    Source(#[from] SourceError),

    /// The payload had no laps or no lap times; rendered as "no data"
    #[error("session has no lap data")]
    NoData,
}

impl LoadError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, LoadError::NoData)
    }
}
