//! Stats Report Task
//!
//! Recurring job that logs cache statistics.

use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::cache::{deadline_after, ExpiringCache};
use crate::error::ScheduleError;
use crate::schedule::{JobHandle, JobSignal, JobSpec, Scheduler};

/// Schedules a repeating job that logs the statistics of `cache` every
/// `interval`, first firing one interval from now.
///
/// # Returns
/// The job handle; cancel it during graceful shutdown.
///
/// # Example
/// ```ignore
/// let report = spawn_stats_report(&scheduler, cache.clone(), Duration::from_secs(3600))?;
/// // Later, during shutdown:
/// report.cancel();
/// ```
pub fn spawn_stats_report<V: Send + 'static>(
    scheduler: &Scheduler,
    cache: ExpiringCache<V>,
    interval: Duration,
) -> Result<JobHandle, ScheduleError> {
    let first = deadline_after(Utc::now(), interval).ok_or_else(|| {
        ScheduleError::InvalidInterval(format!("{interval:?} is out of range"))
    })?;

    let spec = JobSpec::new(first, move || {
        let stats = cache.stats();
        info!(
            "Cache stats: entries={}, aliases={}, hits={}, misses={}, expirations={}, deletions={}, hit_rate={:.2}",
            stats.total_entries,
            stats.total_aliases,
            stats.hits,
            stats.misses,
            stats.expirations,
            stats.deletions,
            stats.hit_rate()
        );
        Ok(JobSignal::Continue)
    })
    .interval(interval)
    .marker("cache_stats_report");

    scheduler.start(spec)
}
