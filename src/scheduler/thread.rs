//! Scheduler backed by a dedicated timer thread.

use crate::error::{Result, StreamError};
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::{Scheduler, Task, TimerHandle};

/// Smallest stack accepted for the timer thread.
const MIN_STACK_SIZE: usize = 16 * 1024;

/// Timer thread configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Name given to the timer thread.
    /// Default: "ripple-timer"
    pub thread_name: String,

    /// Stack size in bytes (None = platform default).
    pub stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: "ripple-timer".to_string(),
            stack_size: None,
        }
    }
}

impl SchedulerConfig {
    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SchedulerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before a thread is spawned.
    pub fn validate(&self) -> Result<()> {
        if self.thread_name.is_empty() {
            return Err(StreamError::InvalidConfig("thread_name is empty".into()));
        }
        if self.thread_name.contains('\0') {
            return Err(StreamError::InvalidConfig(
                "thread_name contains a NUL byte".into(),
            ));
        }
        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(StreamError::InvalidConfig(format!(
                    "stack_size {} is below the minimum of {}",
                    size, MIN_STACK_SIZE
                )));
            }
        }
        Ok(())
    }
}

enum Command {
    Schedule {
        deadline: Instant,
        task: Task,
        cancelled: Arc<AtomicBool>,
    },
    Shutdown,
}

/// Runs timers on a background thread.
///
/// Tasks execute on the timer thread, one at a time, in deadline order.
/// The thread stops on [`shutdown`](ThreadScheduler::shutdown) or drop;
/// timers still pending at that point never fire.
pub struct ThreadScheduler {
    origin: Instant,
    sender: Sender<Command>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    running: AtomicBool,
}

impl ThreadScheduler {
    /// Start the timer thread.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = unbounded();
        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let handle = builder
            .spawn(move || run_timer_loop(receiver))
            .map_err(|e| StreamError::InvalidConfig(format!("failed to spawn timer thread: {}", e)))?;

        debug!(thread = %config.thread_name, "timer thread started");

        Ok(Self {
            origin: Instant::now(),
            sender,
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
            running: AtomicBool::new(true),
        })
    }

    /// Schedule a task, failing if the timer thread has stopped.
    pub fn try_schedule(&self, delay: Duration, task: Task) -> Result<TimerHandle> {
        if !self.running.load(Ordering::Acquire) {
            return Err(StreamError::SchedulerStopped);
        }

        let handle = TimerHandle::new();
        self.sender
            .send(Command::Schedule {
                deadline: Instant::now() + delay,
                task,
                cancelled: Arc::clone(&handle.cancelled),
            })
            .map_err(|_| StreamError::SchedulerStopped)?;
        Ok(handle)
    }

    /// False once the scheduler has been shut down.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the timer thread and wait for it to exit.
    ///
    /// Called from a task running on the timer thread, this only signals the
    /// thread; it exits after the task returns.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(Command::Shutdown);

        if thread::current().id() == self.thread_id {
            return;
        }
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!("timer thread panicked");
            }
        }
        debug!("timer thread stopped");
    }
}

impl Scheduler for ThreadScheduler {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        match self.try_schedule(delay, task) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "timer dropped");
                TimerHandle::dead()
            }
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pending timers keyed by (deadline, scheduling order).
#[derive(Default)]
struct TimerQueue {
    entries: BTreeMap<(Instant, u64), (Task, Arc<AtomicBool>)>,
    next_seq: u64,
}

impl TimerQueue {
    /// Queue a timer, dropping entries cancelled since the last insert.
    fn insert(&mut self, deadline: Instant, task: Task, cancelled: Arc<AtomicBool>) {
        self.entries
            .retain(|_, (_, cancelled)| !cancelled.load(Ordering::Acquire));
        self.entries
            .insert((deadline, self.next_seq), (task, cancelled));
        self.next_seq += 1;
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.entries.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    fn pop(&mut self) -> Option<(Task, Arc<AtomicBool>)> {
        self.entries.pop_first().map(|(_, entry)| entry)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Run one task. A panicking task is logged and the loop keeps going.
fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        warn!(panic = panic_message(payload.as_ref()), "timer task panicked");
    }
}

fn run_timer_loop(receiver: crossbeam_channel::Receiver<Command>) {
    let mut queue = TimerQueue::default();

    loop {
        let command = match queue.next_deadline() {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    if let Some((task, cancelled)) = queue.pop() {
                        if !cancelled.load(Ordering::Acquire) {
                            run_task(task);
                        }
                    }
                    continue;
                }
                receiver.recv_timeout(deadline - now)
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match command {
            Ok(Command::Schedule {
                deadline,
                task,
                cancelled,
            }) => queue.insert(deadline, task, cancelled),
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}
