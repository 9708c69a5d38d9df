//! Background Tasks Module
//!
//! Recurring jobs that run on the scheduler during server operation.
//!
//! # Tasks
//! - Stats Report: logs cache statistics at the configured interval

mod stats_report;

pub use stats_report::spawn_stats_report;
