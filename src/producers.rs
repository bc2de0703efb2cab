//! Timer-backed source emitters.

use crate::emitter::Emitter;
use crate::scheduler::{default_scheduler, SharedScheduler, TimerHandle};
use crate::subscriptions::{Disconnect, Emit, Listenable};
use crate::types::TimeSpan;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Emit `0, 1, 2, ...` every `period` while anyone listens.
///
/// The counter continues where it stopped when the emitter reconnects.
pub fn interval(period: impl Into<TimeSpan>) -> Emitter<u64> {
    interval_on(period, default_scheduler())
}

/// [`interval`] on an explicit scheduler.
pub fn interval_on(period: impl Into<TimeSpan>, scheduler: SharedScheduler) -> Emitter<u64> {
    let period = period.into().as_duration().max(MIN_PERIOD);
    let index = Arc::new(AtomicU64::new(0));
    let registry = Listenable::with_source(move |emit: Emit<u64>| {
        let ticker = Arc::new(Ticker {
            scheduler: Arc::clone(&scheduler),
            period,
            index: Arc::clone(&index),
            emit,
            timer: Mutex::new(TimerHandle::default()),
            stopped: AtomicBool::new(false),
        });
        ticker.arm();
        Some(Box::new(move || ticker.stop()) as Disconnect)
    });
    Emitter::from_listenable(&registry)
}

/// One connection's worth of interval state.
struct Ticker {
    scheduler: SharedScheduler,
    period: Duration,
    index: Arc<AtomicU64>,
    emit: Emit<u64>,
    timer: Mutex<TimerHandle>,
    stopped: AtomicBool,
}

impl Ticker {
    fn arm(self: &Arc<Self>) {
        let ticker = Arc::clone(self);
        let next = self.scheduler.schedule(self.period, Box::new(move || ticker.fire()));
        let mut timer = self.timer.lock();
        if self.stopped.load(Ordering::Acquire) {
            next.cancel();
        } else {
            *timer = next;
        }
    }

    fn fire(self: &Arc<Self>) {
        if self.stopped.load(Ordering::Acquire) || !self.emit.is_alive() {
            return;
        }
        // Re-arm first so a slow handler does not stretch the period.
        self.arm();
        let tick = self.index.fetch_add(1, Ordering::Relaxed);
        self.emit.emit(&tick);
    }

    fn stop(&self) {
        let timer = self.timer.lock();
        self.stopped.store(true, Ordering::Release);
        timer.cancel();
    }
}

/// Emit `()` once when `delay`, measured from now, has elapsed.
///
/// The deadline is fixed here, not at connect time. Connecting after the
/// deadline has passed never fires.
pub fn timeout(delay: impl Into<TimeSpan>) -> Emitter<()> {
    timeout_on(delay, default_scheduler())
}

/// [`timeout`] on an explicit scheduler.
pub fn timeout_on(delay: impl Into<TimeSpan>, scheduler: SharedScheduler) -> Emitter<()> {
    let deadline = scheduler.now() + delay.into().as_duration();
    let registry = Listenable::with_source(move |emit: Emit<()>| {
        let Some(remaining) = deadline.checked_sub(scheduler.now()) else {
            debug!(?deadline, "timeout already elapsed");
            return None;
        };
        let timer = scheduler.schedule(remaining, Box::new(move || emit.emit(&())));
        Some(Box::new(move || timer.cancel()) as Disconnect)
    });
    Emitter::from_listenable(&registry)
}
