//! CLI commands for the signal scanner.

pub mod scan;
pub mod size;

pub use scan::{run_scan, run_watch, ScanArgs, WatchArgs};
pub use size::{run_size, SizeArgs};
