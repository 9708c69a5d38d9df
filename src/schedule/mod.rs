//! Schedule Module
//!
//! Fires callbacks at absolute UTC times, once or on a fixed interval, with
//! cancellation and run-to-completion tracking.

mod job;
mod scheduler;

pub use job::{next_occurrence, Callback, JobPhase, JobSignal, JobSpec};
pub use scheduler::{JobHandle, Scheduler};
