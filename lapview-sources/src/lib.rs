//! Lap payload sources for Lapview

pub mod demo;
pub mod file;
pub mod http;

pub use demo::DemoSource;
pub use file::FileSource;
pub use http::HttpSource;
