//! Market data providers for the scanner.
//!
//! This crate provides:
//! - Yahoo Finance chart client with rate limiting
//! - CSV storage and a file-backed provider for offline runs
//! - Row normalization shared by both

pub mod csv_storage;
pub mod normalize;
pub mod yahoo;

// Re-export commonly used types
pub use csv_storage::{CsvProvider, CsvStorage};
pub use normalize::{normalize, NormalizeStats, RawBar};
pub use yahoo::{ChartResponse, YahooChartProvider, YAHOO_CHART_API};
