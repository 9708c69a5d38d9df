//! Scheduler Module
//!
//! Single driver task over a min-heap of deadlines. Callbacks run on the
//! blocking pool so a slow job never delays the others.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::error::ScheduleError;
use crate::schedule::job::{Job, JobPhase, JobSignal, JobSpec};

/// Stale heap slots tolerated before the heap is compacted.
const COMPACT_THRESHOLD: usize = 64;

// == Queue ==
/// Heap slot. Ordered by deadline, ties broken by job id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    at: DateTime<Utc>,
    job: u64,
}

/// Every armed job has exactly one slot in `heap` and one entry in `jobs`.
/// Slots whose job is missing from `jobs` were cancelled and are skipped.
#[derive(Default)]
struct Queue {
    heap: BinaryHeap<Reverse<Slot>>,
    jobs: HashMap<u64, Arc<Job>>,
    next_id: u64,
    closed: bool,
}

impl Queue {
    /// Pops every slot due at `now`, rearming repeating jobs before returning
    /// them for dispatch.
    fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Arc<Job>> {
        let mut due = Vec::new();
        loop {
            match self.heap.peek() {
                Some(Reverse(slot)) if slot.at <= now => {}
                _ => break,
            }
            let Some(Reverse(slot)) = self.heap.pop() else {
                break;
            };
            let Some(job) = self.jobs.get(&slot.job).cloned() else {
                continue;
            };

            match job.advance() {
                Some(next) => {
                    if !job.silent {
                        info!("CronJob [{}] next job call at [{}]", job.marker, next);
                    }
                    self.heap.push(Reverse(Slot {
                        at: next,
                        job: job.id,
                    }));
                }
                None => {
                    if !job.silent {
                        info!("CronJob [{}] all jobs have been completed", job.marker);
                    }
                    self.jobs.remove(&job.id);
                }
            }
            due.push(job);
        }
        due
    }

    fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(slot)| slot.at)
    }

    fn forget(&mut self, id: u64) {
        self.jobs.remove(&id);
        if self.heap.len() > COMPACT_THRESHOLD && self.heap.len() > 2 * self.jobs.len() {
            let jobs = &self.jobs;
            self.heap.retain(|Reverse(slot)| jobs.contains_key(&slot.job));
        }
    }
}

/// Owned by scheduler clones. The driver only holds a `Weak` and stops once
/// every clone is gone.
struct Shared {
    queue: Mutex<Queue>,
    wakeup: Arc<Notify>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        for job in self.queue.get_mut().jobs.values() {
            job.mark_cancelled();
        }
        self.wakeup.notify_one();
    }
}

// == Job Handle ==
/// Caller-side handle to a scheduled job.
#[derive(Clone)]
pub struct JobHandle {
    job: Arc<Job>,
    shared: Weak<Shared>,
}

impl JobHandle {
    /// Stops any pending wait and prevents future firing. Idempotent.
    pub fn cancel(&self) {
        cancel_job(&self.shared, &self.job);
    }

    pub fn phase(&self) -> JobPhase {
        self.job.phase()
    }

    pub fn is_terminated(&self) -> bool {
        self.phase() == JobPhase::Terminated
    }

    /// Firings dispatched so far.
    pub fn fire_count(&self) -> u64 {
        self.job.fire_count()
    }

    /// Target of the armed occurrence, None once nothing is armed.
    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.job.next_fire_time()
    }

    pub fn marker(&self) -> &str {
        &self.job.marker
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("marker", &self.marker())
            .field("phase", &self.phase())
            .field("fire_count", &self.fire_count())
            .finish()
    }
}

fn cancel_job(shared: &Weak<Shared>, job: &Job) {
    if !job.mark_cancelled() {
        return;
    }
    if let Some(shared) = shared.upgrade() {
        shared.queue.lock().forget(job.id);
    }
    if !job.silent {
        info!("CronJob [{}] shutting down...", job.marker);
    }
}

// == Scheduler ==
/// Runs callbacks at absolute UTC times, optionally repeating.
///
/// Cloning is cheap; all clones drive the same queue.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Scheduler {
    // == Constructor ==
    /// Creates a scheduler and spawns its driver task.
    ///
    /// Must be called from within a Tokio runtime. Dropping the last clone
    /// without `shutdown` cancels the remaining jobs and stops the driver.
    pub fn new() -> Self {
        let wakeup = Arc::new(Notify::new());
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            wakeup: wakeup.clone(),
        });
        tokio::spawn(drive(Arc::downgrade(&shared), wakeup));
        Self { shared }
    }

    // == Start ==
    /// Validates `spec` and arms its first occurrence.
    ///
    /// # Errors
    /// - `NotInFuture` if the target is not strictly after now
    /// - `InvalidCallLimit` if the call limit is zero
    /// - `InvalidInterval` if the interval is zero or out of range
    /// - `Closed` after `shutdown`
    pub fn start(&self, spec: JobSpec) -> Result<JobHandle, ScheduleError> {
        if spec.call_limit == Some(0) {
            return Err(ScheduleError::InvalidCallLimit);
        }

        let interval = match spec.interval {
            Some(interval) if interval.is_zero() => {
                return Err(ScheduleError::InvalidInterval(
                    "interval must be greater than 0".to_string(),
                ));
            }
            Some(interval) => Some(
                TimeDelta::from_std(interval)
                    .map_err(|err| ScheduleError::InvalidInterval(err.to_string()))?,
            ),
            None => None,
        };

        let now = Utc::now();
        if spec.target <= now {
            return Err(ScheduleError::NotInFuture {
                target: spec.target,
                now,
            });
        }

        let target = spec.target;
        let mut queue = self.shared.queue.lock();
        if queue.closed {
            return Err(ScheduleError::Closed);
        }

        queue.next_id += 1;
        let job = Arc::new(Job::new(queue.next_id, spec, interval));
        let earliest = queue.next_deadline().map_or(true, |at| target < at);
        queue.heap.push(Reverse(Slot {
            at: target,
            job: job.id,
        }));
        queue.jobs.insert(job.id, job.clone());
        drop(queue);

        if !job.silent {
            let wait = (target - now).to_std().unwrap_or(Duration::ZERO);
            info!(
                "CronJob [{}] next job call in [{:?}] at [{}]",
                job.marker, wait, target
            );
        }
        if earliest {
            self.shared.wakeup.notify_one();
        }

        Ok(JobHandle {
            job,
            shared: Arc::downgrade(&self.shared),
        })
    }

    // == Job Count ==
    /// Number of jobs with an armed occurrence.
    pub fn job_count(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().closed
    }

    // == Shutdown ==
    /// Cancels every job without running callbacks and stops the driver.
    pub fn shutdown(&self) {
        let cancelled = {
            let mut queue = self.shared.queue.lock();
            if queue.closed {
                return;
            }
            queue.closed = true;
            queue.heap.clear();
            let jobs: Vec<Arc<Job>> = queue.jobs.drain().map(|(_, job)| job).collect();
            for job in &jobs {
                job.mark_cancelled();
            }
            jobs.len()
        };
        self.shared.wakeup.notify_one();
        info!("Scheduler shut down, {} pending jobs cancelled", cancelled);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.shared.queue.lock();
        f.debug_struct("Scheduler")
            .field("jobs", &queue.jobs.len())
            .field("closed", &queue.closed)
            .finish()
    }
}

// == Driver ==
async fn drive(weak: Weak<Shared>, wakeup: Arc<Notify>) {
    debug!("Scheduler driver started");

    loop {
        // The strong reference never lives across an await.
        let Some(shared) = weak.upgrade() else {
            break;
        };
        let (due, next_deadline) = {
            let mut queue = shared.queue.lock();
            if queue.closed {
                break;
            }
            let due = queue.take_due(Utc::now());
            (due, queue.next_deadline())
        };
        drop(shared);

        for job in due {
            dispatch(weak.clone(), job);
        }

        match next_deadline {
            Some(at) => {
                let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = wakeup.notified() => {}
                }
            }
            None => wakeup.notified().await,
        }
    }

    debug!("Scheduler driver stopped");
}

/// Runs one firing. Errors and panics stop here.
///
/// The cancelled flag is checked on the blocking thread right before the
/// callback, so a `cancel` that returned while the firing waited for a
/// blocking worker still wins.
fn dispatch(shared: Weak<Shared>, job: Arc<Job>) {
    tokio::spawn(async move {
        let firing = job.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            if firing.is_cancelled() {
                return None;
            }
            Some((firing.callback)())
        })
        .await;

        let stop = match outcome {
            Ok(None) => {
                if !job.silent {
                    debug!("CronJob [{}] firing skipped, job cancelled", job.marker);
                }
                false
            }
            Ok(Some(Ok(JobSignal::Continue))) => false,
            Ok(Some(Ok(JobSignal::Terminate))) => {
                if !job.silent {
                    warn!(
                        "CronJob [{}] job terminated via termination response",
                        job.marker
                    );
                }
                true
            }
            Ok(Some(Err(err))) => {
                error!("CronJob [{}] job exception: {:#}", job.marker, err);
                job.terminate_on_error
            }
            Err(err) => {
                error!("CronJob [{}] job panicked: {}", job.marker, err);
                job.terminate_on_error
            }
        };

        if stop {
            cancel_job(&shared, &job);
        }
        job.finish_firing();
    });
}
