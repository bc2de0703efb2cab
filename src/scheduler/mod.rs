//! Time and timer services for time-based operators.
//!
//! Operators never touch the system clock directly. They read time and arm
//! one-shot timers through a [`Scheduler`], so tests can drive virtual time
//! with [`ManualScheduler`] while applications use the [`ThreadScheduler`]
//! returned by [`default_scheduler`].

mod manual;
mod thread;

pub use manual::ManualScheduler;
pub use thread::{SchedulerConfig, ThreadScheduler};

use crate::error::{Result, StreamError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Work queued on a scheduler.
pub type Task = Box<dyn FnOnce() + Send>;

/// Clock plus one-shot timers.
pub trait Scheduler: Send + Sync {
    /// Monotonic time elapsed since the scheduler's origin.
    fn now(&self) -> Duration;

    /// Run `task` once after `delay`.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;
}

/// Scheduler shared between operators.
pub type SharedScheduler = Arc<dyn Scheduler>;

/// Handle to a pending timer.
#[derive(Clone, Debug, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A handle whose task will never run.
    pub(crate) fn dead() -> Self {
        let handle = Self::new();
        handle.cancel();
        handle
    }

    /// Prevent the task from running if it has not run yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](TimerHandle::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

static DEFAULT_SCHEDULER: OnceLock<SharedScheduler> = OnceLock::new();

/// The process-wide scheduler used by operators without an explicit one.
///
/// Started lazily on first use from [`SchedulerConfig::default`].
pub fn default_scheduler() -> SharedScheduler {
    DEFAULT_SCHEDULER
        .get_or_init(|| match ThreadScheduler::new(SchedulerConfig::default()) {
            Ok(scheduler) => Arc::new(scheduler),
            Err(e) => {
                tracing::warn!(error = %e, "timer thread unavailable, timers will not fire");
                Arc::new(ManualScheduler::new())
            }
        })
        .clone()
}

/// Install the process-wide scheduler. Fails once a default is in use.
pub fn set_default_scheduler(scheduler: SharedScheduler) -> Result<()> {
    DEFAULT_SCHEDULER
        .set(scheduler)
        .map_err(|_| StreamError::InvalidConfig("default scheduler already initialized".into()))
}
