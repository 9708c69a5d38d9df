//! Job Module
//!
//! Job specification builder, callback signals and the per-job firing state.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use parking_lot::Mutex;

/// Zero-argument action run on every firing.
pub type Callback = Arc<dyn Fn() -> anyhow::Result<JobSignal> + Send + Sync>;

// == Job Signal ==
/// Value returned by a callback to steer its own repeat schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JobSignal {
    /// Keep the armed follow-up, if any
    #[default]
    Continue,
    /// Cancel the armed follow-up and terminate the job
    Terminate,
}

// == Job Phase ==
/// Observable lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// Waiting for its next target time
    Armed,
    /// A callback invocation is in progress
    Firing,
    /// No further firing will happen. Absorbing.
    Terminated,
}

// == Job Spec ==
/// Builder describing a job to hand to `Scheduler::start`.
///
/// # Example
/// ```ignore
/// let spec = JobSpec::new(Utc::now() + TimeDelta::hours(1), || Ok(JobSignal::Continue))
///     .interval(Duration::from_secs(3600))
///     .marker("playlist_tracking")
///     .call_limit(24);
/// ```
pub struct JobSpec {
    pub(crate) target: DateTime<Utc>,
    pub(crate) callback: Callback,
    pub(crate) interval: Option<Duration>,
    pub(crate) marker: Option<String>,
    pub(crate) round_to_month: bool,
    pub(crate) call_limit: Option<u32>,
    pub(crate) silent: bool,
    pub(crate) terminate_on_error: bool,
}

impl JobSpec {
    /// Creates a single-shot job firing at `target`.
    pub fn new<F>(target: DateTime<Utc>, callback: F) -> Self
    where
        F: Fn() -> anyhow::Result<JobSignal> + Send + Sync + 'static,
    {
        Self {
            target,
            callback: Arc::new(callback),
            interval: None,
            marker: None,
            round_to_month: false,
            call_limit: None,
            silent: false,
            terminate_on_error: false,
        }
    }

    /// Repeats the job every `interval`, anchored to the first target.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Human-readable name used in log lines.
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Moves every repeat onto the first day of a month.
    pub fn round_to_month(mut self) -> Self {
        self.round_to_month = true;
        self
    }

    /// Caps the total number of firings.
    pub fn call_limit(mut self, limit: u32) -> Self {
        self.call_limit = Some(limit);
        self
    }

    /// Suppresses lifecycle logging. Callback failures are still logged.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Stops the repeat schedule when a callback fails or panics.
    pub fn terminate_on_error(mut self) -> Self {
        self.terminate_on_error = true;
        self
    }
}

impl fmt::Debug for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSpec")
            .field("target", &self.target)
            .field("interval", &self.interval)
            .field("marker", &self.marker)
            .field("round_to_month", &self.round_to_month)
            .field("call_limit", &self.call_limit)
            .field("silent", &self.silent)
            .field("terminate_on_error", &self.terminate_on_error)
            .finish()
    }
}

// == Job ==
/// Mutable firing state, guarded by the job's own lock.
#[derive(Debug)]
pub(crate) struct Progress {
    /// Target of the currently armed occurrence
    pub(crate) target: DateTime<Utc>,
    /// Firings left, None = unlimited
    pub(crate) remaining: Option<u32>,
    /// Total firings dispatched
    pub(crate) fired: u64,
    /// Callback invocations not yet finished
    pub(crate) in_flight: u32,
    /// No occurrence is armed any more
    pub(crate) exhausted: bool,
}

/// A validated job owned by the scheduler queue.
pub(crate) struct Job {
    pub(crate) id: u64,
    pub(crate) marker: String,
    pub(crate) silent: bool,
    pub(crate) callback: Callback,
    pub(crate) interval: Option<TimeDelta>,
    pub(crate) round_to_month: bool,
    pub(crate) terminate_on_error: bool,
    cancelled: AtomicBool,
    progress: Mutex<Progress>,
}

impl Job {
    pub(crate) fn new(id: u64, spec: JobSpec, interval: Option<TimeDelta>) -> Self {
        Self {
            id,
            marker: spec.marker.unwrap_or_else(|| format!("job_{id}")),
            silent: spec.silent,
            callback: spec.callback,
            interval,
            round_to_month: spec.round_to_month,
            terminate_on_error: spec.terminate_on_error,
            cancelled: AtomicBool::new(false),
            progress: Mutex::new(Progress {
                target: spec.target,
                remaining: spec.call_limit,
                fired: 0,
                in_flight: 0,
                exhausted: false,
            }),
        }
    }

    /// Records a firing and computes the follow-up target, if one is due.
    ///
    /// Must run before the callback so the cadence stays anchored to the
    /// original start time.
    pub(crate) fn advance(&self) -> Option<DateTime<Utc>> {
        let mut progress = self.progress.lock();
        progress.fired += 1;
        progress.in_flight += 1;

        let rearm = self.interval.is_some() && progress.remaining.map_or(true, |left| left > 1);
        if let Some(left) = progress.remaining.as_mut() {
            *left = left.saturating_sub(1);
        }

        let next = if rearm {
            self.interval
                .and_then(|interval| next_occurrence(progress.target, interval, self.round_to_month))
        } else {
            None
        };

        match next {
            Some(at) => progress.target = at,
            None => progress.exhausted = true,
        }
        next
    }

    pub(crate) fn finish_firing(&self) {
        let mut progress = self.progress.lock();
        progress.in_flight = progress.in_flight.saturating_sub(1);
    }

    /// Sets the cancelled flag. Returns true only for the first call.
    pub(crate) fn mark_cancelled(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn phase(&self) -> JobPhase {
        if self.is_cancelled() {
            return JobPhase::Terminated;
        }
        let progress = self.progress.lock();
        if progress.in_flight > 0 {
            JobPhase::Firing
        } else if progress.exhausted {
            JobPhase::Terminated
        } else {
            JobPhase::Armed
        }
    }

    pub(crate) fn fire_count(&self) -> u64 {
        self.progress.lock().fired
    }

    pub(crate) fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        if self.is_cancelled() {
            return None;
        }
        let progress = self.progress.lock();
        (!progress.exhausted).then_some(progress.target)
    }
}

// == Calendar Arithmetic ==
/// Computes the follow-up target of a repeating job.
///
/// With `round_to_month` the result is the first day of the month reached by
/// `previous + interval`, pushed one month further if that would not move
/// past `previous`. Time of day is preserved. Returns None on overflow.
pub fn next_occurrence(
    previous: DateTime<Utc>,
    interval: TimeDelta,
    round_to_month: bool,
) -> Option<DateTime<Utc>> {
    let candidate = previous.checked_add_signed(interval)?;
    if !round_to_month {
        return Some(candidate);
    }

    let first = candidate.with_day(1)?;
    if first > previous {
        return Some(first);
    }

    let naive = first.naive_utc();
    let (year, month) = if naive.month() == 12 {
        (naive.year() + 1, 1)
    } else {
        (naive.year(), naive.month() + 1)
    };
    let date = NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(date.and_time(naive.time()).and_utc())
}
