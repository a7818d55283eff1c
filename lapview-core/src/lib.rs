//! Lapview Core Library
//!
//! This crate provides the lap track data model, lap-time utilities, the
//! signal analyzer (braking/acceleration events, gear estimation) and the
//! data-source trait shared by every lap payload provider.

pub mod analysis;
pub mod model;
pub mod source;
pub mod timing;
pub mod units;

pub use analysis::{AnalysisSettings, LapAnalysis};
pub use model::{bounds_of, Drivetrain, GeoBounds, GeoPoint, Lap, LapStats, SessionPayload, TrackPoint};
pub use source::{LapDataSource, SourceError};
