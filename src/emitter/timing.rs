//! Timer-driven operators.
//!
//! Each operator has a `*_on` form taking an explicit scheduler and a plain
//! form using [`default_scheduler`].

use crate::scheduler::{default_scheduler, SharedScheduler, TimerHandle};
use crate::subscriptions::Emit;
use crate::types::{TimeSpan, Value};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::Emitter;

/// Collected items of an open batch.
struct Batch<T> {
    items: Vec<T>,
    armed: bool,
}

impl<T: Value + Clone> Emitter<T> {
    /// Emit a value only after `period` passes without another value.
    pub fn debounce(&self, period: impl Into<TimeSpan>) -> Emitter<T> {
        self.debounce_on(period, default_scheduler())
    }

    /// [`debounce`](Emitter::debounce) on an explicit scheduler.
    pub fn debounce_on(&self, period: impl Into<TimeSpan>, scheduler: SharedScheduler) -> Emitter<T> {
        let period = period.into().as_duration();
        let pending: Mutex<Option<TimerHandle>> = Mutex::new(None);
        self.transform(move |value, emit: &Emit<T>| {
            let (value, emit) = (value.clone(), emit.clone());
            let timer = scheduler.schedule(period, Box::new(move || emit.emit(&value)));
            let previous = pending.lock().replace(timer);
            if let Some(previous) = previous {
                previous.cancel();
            }
        })
    }

    /// Forward a value only if `period` has passed since the last forwarded
    /// one. Dropped values are not replayed later.
    pub fn throttle(&self, period: impl Into<TimeSpan>) -> Emitter<T> {
        self.throttle_on(period, default_scheduler())
    }

    /// [`throttle`](Emitter::throttle) on an explicit scheduler.
    pub fn throttle_on(&self, period: impl Into<TimeSpan>, scheduler: SharedScheduler) -> Emitter<T> {
        let period = period.into().as_duration();
        let last: Mutex<Option<Duration>> = Mutex::new(None);
        self.transform(move |value, emit: &Emit<T>| {
            let now = scheduler.now();
            let forward = {
                let mut last = last.lock();
                let open = last.map_or(true, |at| now >= at + period);
                if open {
                    *last = Some(now);
                }
                open
            };
            if forward {
                emit.emit(value);
            }
        })
    }

    /// Collect values for `period` after the first of a batch, then emit
    /// them together.
    pub fn batch(&self, period: impl Into<TimeSpan>) -> Emitter<Vec<T>> {
        self.batch_on(period, default_scheduler())
    }

    /// [`batch`](Emitter::batch) on an explicit scheduler.
    pub fn batch_on(&self, period: impl Into<TimeSpan>, scheduler: SharedScheduler) -> Emitter<Vec<T>> {
        let period = period.into().as_duration();
        let batch = Arc::new(Mutex::new(Batch {
            items: Vec::new(),
            armed: false,
        }));
        self.transform(move |value, emit: &Emit<Vec<T>>| {
            let arm = {
                let mut open = batch.lock();
                open.items.push(value.clone());
                !std::mem::replace(&mut open.armed, true)
            };
            if arm {
                let (batch, emit) = (Arc::clone(&batch), emit.clone());
                scheduler.schedule(
                    period,
                    Box::new(move || {
                        let items = {
                            let mut open = batch.lock();
                            open.armed = false;
                            std::mem::take(&mut open.items)
                        };
                        emit.emit(&items);
                    }),
                );
            }
        })
    }

    /// Re-emit every value `period` later, in arrival order.
    pub fn delay(&self, period: impl Into<TimeSpan>) -> Emitter<T> {
        self.delay_on(period, default_scheduler())
    }

    /// [`delay`](Emitter::delay) on an explicit scheduler.
    pub fn delay_on(&self, period: impl Into<TimeSpan>, scheduler: SharedScheduler) -> Emitter<T> {
        let period = period.into().as_duration();
        self.transform(move |value, emit: &Emit<T>| {
            let (value, emit) = (value.clone(), emit.clone());
            scheduler.schedule(period, Box::new(move || emit.emit(&value)));
        })
    }
}
