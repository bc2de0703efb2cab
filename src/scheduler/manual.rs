//! Virtual-time scheduler driven by the caller.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{Scheduler, Task, TimerHandle};

struct Pending {
    task: Task,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_seq: u64,
    /// Keyed by (deadline, scheduling order).
    queue: BTreeMap<(Duration, u64), Pending>,
}

/// A scheduler whose clock only moves when [`advance`](ManualScheduler::advance) is called.
///
/// Due tasks run on the caller's thread in deadline order, ties broken by
/// scheduling order. Tasks scheduled by a running task are picked up in the
/// same `advance` call if their deadline falls inside the window.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<State>,
}

impl ManualScheduler {
    /// Create a scheduler with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scheduler ready to be handed to operators.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Move the clock forward, running every task that falls due.
    pub fn advance(&self, by: impl Into<crate::types::TimeSpan>) {
        let target = self.state.lock().now + by.into().as_duration();

        while let Some(pending) = self.pop_due(target) {
            if !pending.cancelled.load(Ordering::Acquire) {
                (pending.task)();
            }
        }

        let mut state = self.state.lock();
        if state.now < target {
            state.now = target;
        }
    }

    /// Number of tasks that are scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .queue
            .values()
            .filter(|p| !p.cancelled.load(Ordering::Acquire))
            .count()
    }

    fn pop_due(&self, target: Duration) -> Option<Pending> {
        let mut state = self.state.lock();
        let (&(deadline, _), _) = state.queue.first_key_value()?;
        if deadline > target {
            return None;
        }
        let (_, pending) = state.queue.pop_first()?;
        state.now = deadline;
        Some(pending)
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::new();
        let mut state = self.state.lock();
        state
            .queue
            .retain(|_, pending| !pending.cancelled.load(Ordering::Acquire));
        let key = (state.now + delay, state.next_seq);
        state.next_seq += 1;
        state.queue.insert(
            key,
            Pending {
                task,
                cancelled: Arc::clone(&handle.cancelled),
            },
        );
        handle
    }
}
