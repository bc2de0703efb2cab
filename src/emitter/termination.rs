//! Operators that complete and let go of their parent.
//!
//! These connect lazily like every other operator. Once complete they
//! unsubscribe from the parent and never connect again, even for new handlers.

use crate::interop::IntoEmitter;
use crate::subscriptions::{release, Disconnect, Emit, Listenable, Subscription};
use crate::types::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::Emitter;

/// The live upstream subscriptions of a terminating operator.
#[derive(Clone, Default)]
struct Upstream {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl Upstream {
    fn hold(&self, subscription: Subscription) {
        self.subscriptions.lock().push(subscription);
    }

    fn release_all(&self, context: &'static str) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in subscriptions {
            release(subscription, context);
        }
    }

    fn disconnect(&self, context: &'static str) -> Option<Disconnect> {
        let upstream = self.clone();
        Some(Box::new(move || upstream.release_all(context)))
    }
}

/// What a terminating operator does with one parent value.
enum Step {
    /// Emit and keep going.
    Forward,
    /// Emit, then complete.
    Last,
    /// Complete without emitting.
    Stop,
}

/// Connect `parent` through `relay` unless already complete.
///
/// Completion is recorded before the final value is emitted, so a parent that
/// re-enters during that emit is ignored. A parent that completes the operator
/// while the subscription is still being made (a synchronous replay) is
/// released as soon as `listen` returns.
fn connect_terminating<T, F>(
    parent: &Emitter<T>,
    completed: &Arc<AtomicBool>,
    emit: Emit<T>,
    context: &'static str,
    relay: F,
) -> Option<Disconnect>
where
    T: Value,
    F: Fn(&T) -> Step + Send + Sync + 'static,
{
    if completed.load(Ordering::Acquire) {
        return None;
    }

    let upstream = Upstream::default();
    let (done, held) = (Arc::clone(completed), upstream.clone());
    let subscription = parent.listen(move |value: &T| {
        if done.load(Ordering::Acquire) {
            return;
        }
        match relay(value) {
            Step::Forward => emit.emit(value),
            step => {
                done.store(true, Ordering::Release);
                debug!(operator = context, "completed");
                if matches!(step, Step::Last) {
                    emit.emit(value);
                }
                held.release_all(context);
            }
        }
    });

    if completed.load(Ordering::Acquire) {
        release(subscription, context);
        return None;
    }
    upstream.hold(subscription);
    upstream.disconnect(context)
}

impl<T: Value> Emitter<T> {
    /// Forward the first value, then disconnect for good.
    pub fn once(&self) -> Emitter<T> {
        let parent = self.clone();
        let completed = Arc::new(AtomicBool::new(false));
        let registry = Listenable::with_source(move |emit| {
            connect_terminating(&parent, &completed, emit, "once", |_| Step::Last)
        });
        Emitter::from_listenable(&registry)
    }

    /// Forward at most `limit` values, then disconnect for good.
    ///
    /// `take(0)` never connects to the parent.
    pub fn take(&self, limit: usize) -> Emitter<T> {
        let parent = self.clone();
        let completed = Arc::new(AtomicBool::new(limit == 0));
        let count = Arc::new(Mutex::new(0usize));
        let registry = Listenable::with_source(move |emit| {
            let count = Arc::clone(&count);
            connect_terminating(&parent, &completed, emit, "take", move |_| {
                let mut count = count.lock();
                *count += 1;
                if *count >= limit {
                    Step::Last
                } else {
                    Step::Forward
                }
            })
        });
        Emitter::from_listenable(&registry)
    }

    /// Forward values while `predicate` holds. The first failing value is
    /// dropped and the operator disconnects for good.
    pub fn take_while<F>(&self, predicate: F) -> Emitter<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let parent = self.clone();
        let completed = Arc::new(AtomicBool::new(false));
        let predicate = Arc::new(predicate);
        let registry = Listenable::with_source(move |emit| {
            let predicate = Arc::clone(&predicate);
            connect_terminating(&parent, &completed, emit, "take_while", move |value| {
                if predicate(value) {
                    Step::Forward
                } else {
                    Step::Stop
                }
            })
        });
        Emitter::from_listenable(&registry)
    }

    /// Forward values until `notifier` emits, then disconnect from both for
    /// good.
    ///
    /// A notifier that replays on subscribe, such as a subject, ends the
    /// stream as soon as it connects.
    pub fn take_until<N, S>(&self, notifier: S) -> Emitter<T>
    where
        N: Value,
        S: IntoEmitter<N>,
    {
        let parent = self.clone();
        let notifier = notifier.into_emitter();
        let completed = Arc::new(AtomicBool::new(false));
        let registry = Listenable::with_source(move |emit: Emit<T>| {
            if completed.load(Ordering::Acquire) {
                return None;
            }

            let upstream = Upstream::default();
            let done = Arc::clone(&completed);
            upstream.hold(parent.listen(move |value: &T| {
                if !done.load(Ordering::Acquire) {
                    emit.emit(value);
                }
            }));

            let (done, held) = (Arc::clone(&completed), upstream.clone());
            let stop = notifier.listen(move |_: &N| {
                if !done.swap(true, Ordering::AcqRel) {
                    debug!(operator = "take_until", "completed");
                }
                held.release_all("take_until");
            });

            if completed.load(Ordering::Acquire) {
                release(stop, "take_until");
                upstream.release_all("take_until");
                return None;
            }
            upstream.hold(stop);
            upstream.disconnect("take_until")
        });
        Emitter::from_listenable(&registry)
    }
}

#[cfg(test)]
mod tests {
    use super::super::create_event_source;
    use super::super::test_support::{Recorder, SpySource};
    use crate::subject::SubjectEmitter;

    #[test]
    fn test_once_forwards_single_value() {
        let spy = SpySource::new();
        let recorder = Recorder::new();
        let once = spy.emitter.once();
        assert_eq!(spy.connects(), 0);

        let _sub = recorder.attach(&once);
        assert_eq!(spy.connects(), 1);
        spy.emit(1);
        spy.emit(2);

        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(spy.disconnects(), 1);
    }

    #[test]
    fn test_once_is_inert_after_completion() {
        let spy = SpySource::new();
        let once = spy.emitter.once();
        let first = Recorder::new();
        let sub = first.attach(&once);
        spy.emit(1);
        sub.unsubscribe().unwrap();

        let second = Recorder::new();
        let _sub = second.attach(&once);
        spy.emit(2);

        assert_eq!(spy.connects(), 1);
        assert!(second.values().is_empty());
    }

    #[test]
    fn test_once_with_replaying_parent() {
        let subject = SubjectEmitter::new(7);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&subject.once());
        subject.next(8);

        assert_eq!(recorder.values(), vec![7]);
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[test]
    fn test_take_zero_never_connects() {
        let spy = SpySource::new();
        let recorder = Recorder::new();
        let _sub = recorder.attach(&spy.emitter.take(0));
        spy.emit(1);

        assert_eq!(spy.connects(), 0);
        assert!(recorder.values().is_empty());
    }

    #[test]
    fn test_take_one_then_disconnect() {
        let spy = SpySource::new();
        let recorder = Recorder::new();
        let _sub = recorder.attach(&spy.emitter.take(1));

        spy.emit(1);
        assert_eq!(spy.disconnects(), 1);
        spy.emit(2);
        assert_eq!(recorder.values(), vec![1]);
    }

    #[test]
    fn test_take_counts_across_reconnects() {
        let spy = SpySource::new();
        let take = spy.emitter.take(3);
        let recorder = Recorder::new();

        let sub = recorder.attach(&take);
        spy.emit(1);
        spy.emit(2);
        sub.unsubscribe().unwrap();

        let _sub = recorder.attach(&take);
        spy.emit(3);
        spy.emit(4);
        assert_eq!(recorder.values(), vec![1, 2, 3]);
        assert_eq!(spy.connects(), 2);
        assert_eq!(spy.disconnects(), 2);
    }

    #[test]
    fn test_take_while_stops_on_first_failure() {
        let spy = SpySource::new();
        let recorder = Recorder::new();
        let _sub = recorder.attach(&spy.emitter.take_while(|v| *v < 3));

        for v in [1, 2, 3, 1, 2] {
            spy.emit(v);
        }
        assert_eq!(recorder.values(), vec![1, 2]);
        assert_eq!(spy.disconnects(), 1);
    }

    #[test]
    fn test_take_until_notifier() {
        let spy = SpySource::new();
        let stop = create_event_source::<()>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&spy.emitter.take_until(stop.emitter()));
        assert_eq!(stop.handler_count(), 1);

        spy.emit(1);
        stop.emit(&());
        spy.emit(2);

        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(spy.disconnects(), 1);
        assert_eq!(stop.handler_count(), 0);
    }

    #[test]
    fn test_take_until_is_lazy_on_both_sides() {
        let spy = SpySource::new();
        let stop = create_event_source::<()>(None);
        let limited = spy.emitter.take_until(stop.emitter());

        assert_eq!(spy.connects(), 0);
        assert_eq!(stop.handler_count(), 0);

        let recorder = Recorder::new();
        let sub = recorder.attach(&limited);
        sub.unsubscribe().unwrap();
        assert_eq!(spy.disconnects(), 1);
        assert_eq!(stop.handler_count(), 0);
    }

    #[test]
    fn test_take_until_replaying_notifier_ends_immediately() {
        let spy = SpySource::new();
        let stop = SubjectEmitter::new(false);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&spy.emitter.take_until(&stop));

        spy.emit(1);
        assert!(recorder.values().is_empty());
        assert_eq!(stop.subscriber_count(), 0);
        assert_eq!(spy.disconnects(), 1);
    }
}
