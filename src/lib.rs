//! Timed Cache - An in-process expiring cache with alias lookup
//!
//! Entries are evicted exactly at expiry by jobs on a shared scheduler, which
//! also runs recurring background jobs.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod schedule;
pub mod tasks;
pub mod throttle;

pub use api::AppState;
pub use cache::ExpiringCache;
pub use config::Config;
pub use error::ScheduleError;
pub use schedule::{JobHandle, JobPhase, JobSignal, JobSpec, Scheduler};
pub use tasks::spawn_stats_report;
pub use throttle::ResendThrottle;
