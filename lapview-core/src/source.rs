//! Lap data source trait definition

use crate::model::SessionPayload;
use async_trait::async_trait;
use thiserror::Error;

/// Failure to obtain a lap payload
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("malformed lap payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for anything that can supply a session's lap payload
///
/// Each source is responsible for:
/// - Locating the payload (URL, file, generator)
/// - Decoding it into a [`SessionPayload`]
///
/// Sources perform no validation beyond decoding; an empty payload is a
/// successful fetch.
#[async_trait]
pub trait LapDataSource: Send + Sync {
    /// Short human-readable description used in logs
    fn describe(&self) -> String;

    /// Fetch and decode the payload
    async fn fetch(&self) -> Result<SessionPayload, SourceError>;
}
