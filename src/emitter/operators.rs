//! Stateless and counting operators built on `transform`.

use crate::subscriptions::Emit;
use crate::types::Value;
use parking_lot::Mutex;

use super::Emitter;

impl<T: Value> Emitter<T> {
    /// Emit `f(value)` for every parent value.
    pub fn map<R, F>(&self, f: F) -> Emitter<R>
    where
        R: Value,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        self.transform(move |value, emit: &Emit<R>| emit.emit(&f(value)))
    }

    /// Forward only the values for which `check` returns true.
    pub fn filter<F>(&self, check: F) -> Emitter<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.transform(move |value, emit: &Emit<T>| {
            if check(value) {
                emit.emit(value);
            }
        })
    }

    /// Forward every value, calling `side_effect` first.
    ///
    /// `side_effect` runs once per parent emission no matter how many handlers
    /// are attached, and not at all while none are.
    pub fn tap<F>(&self, side_effect: F) -> Emitter<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.transform(move |value, emit: &Emit<T>| {
            side_effect(value);
            emit.emit(value);
        })
    }

    /// Drop values equal to the last value forwarded.
    pub fn dedupe(&self) -> Emitter<T>
    where
        T: Clone + PartialEq,
    {
        self.dedupe_by(|a, b| a == b)
    }

    /// Drop values that `same(previous, next)` considers equal to the last
    /// value forwarded.
    pub fn dedupe_by<F>(&self, same: F) -> Emitter<T>
    where
        T: Clone,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let previous: Mutex<Option<T>> = Mutex::new(None);
        self.transform(move |value, emit: &Emit<T>| {
            let forward = {
                let mut previous = previous.lock();
                let changed = previous.as_ref().map_or(true, |prev| !same(prev, value));
                if changed {
                    *previous = Some(value.clone());
                }
                changed
            };
            if forward {
                emit.emit(value);
            }
        })
    }

    /// Fold each value into a running state and emit the new state.
    pub fn scan<S, F>(&self, updater: F, initial: S) -> Emitter<S>
    where
        S: Value + Clone,
        F: Fn(&S, &T) -> S + Send + Sync + 'static,
    {
        let state = Mutex::new(initial);
        self.transform(move |value, emit: &Emit<S>| {
            let next = {
                let mut state = state.lock();
                let next = updater(&state, value);
                *state = next.clone();
                next
            };
            emit.emit(&next);
        })
    }

    /// Emit values in groups of `count`.
    ///
    /// A partial group is held until it fills; it is never flushed early.
    /// A `count` of zero behaves as one.
    pub fn buffer(&self, count: usize) -> Emitter<Vec<T>>
    where
        T: Clone,
    {
        let count = count.max(1);
        let buffer: Mutex<Vec<T>> = Mutex::new(Vec::with_capacity(count));
        self.transform(move |value, emit: &Emit<Vec<T>>| {
            let full = {
                let mut buffer = buffer.lock();
                buffer.push(value.clone());
                if buffer.len() >= count {
                    Some(std::mem::replace(&mut *buffer, Vec::with_capacity(count)))
                } else {
                    None
                }
            };
            if let Some(items) = full {
                emit.emit(&items);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::create_event_source;
    use super::super::test_support::{Recorder, SpySource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_map_and_filter() {
        let source = create_event_source::<i32>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&source.emitter().filter(|v| v % 2 == 0).map(|v| v * 10));

        for v in 1..=6 {
            source.emit(&v);
        }
        assert_eq!(recorder.values(), vec![20, 40, 60]);
    }

    #[test]
    fn test_map_changes_type() {
        let source = create_event_source::<u32>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&source.emitter().map(|v| format!("#{}", v)));

        source.emit(&7);
        assert_eq!(recorder.values(), vec!["#7".to_string()]);
    }

    #[test]
    fn test_tap_runs_once_per_emission() {
        let source = create_event_source::<i32>(None);
        let taps = Arc::new(AtomicUsize::new(0));
        let t = taps.clone();
        let tapped = source.emitter().tap(move |_| {
            t.fetch_add(1, Ordering::SeqCst);
        });

        source.emit(&1);
        assert_eq!(taps.load(Ordering::SeqCst), 0);

        let a = Recorder::new();
        let b = Recorder::new();
        let _a = a.attach(&tapped);
        let _b = b.attach(&tapped);
        source.emit(&2);

        assert_eq!(taps.load(Ordering::SeqCst), 1);
        assert_eq!(a.values(), vec![2]);
        assert_eq!(b.values(), vec![2]);
    }

    #[test]
    fn test_dedupe_default_equality() {
        let source = create_event_source::<i32>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&source.emitter().dedupe());

        for v in [1, 1, 2, 2, 2, 1] {
            source.emit(&v);
        }
        assert_eq!(recorder.values(), vec![1, 2, 1]);
    }

    #[test]
    fn test_dedupe_by_custom_comparison() {
        let source = create_event_source::<String>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(
            &source
                .emitter()
                .dedupe_by(|a, b| a.eq_ignore_ascii_case(b)),
        );

        for v in ["a", "A", "b", "B", "a"] {
            source.emit(&v.to_string());
        }
        assert_eq!(recorder.values(), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_scan_emits_running_state() {
        let source = create_event_source::<i32>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&source.emitter().scan(|sum, v| sum + v, 0));

        for v in [1, 2, 3, 4] {
            source.emit(&v);
        }
        assert_eq!(recorder.values(), vec![1, 3, 6, 10]);
    }

    #[test]
    fn test_buffer_no_trailing_flush() {
        let source = create_event_source::<char>(None);
        let recorder = Recorder::new();
        let _sub = recorder.attach(&source.emitter().buffer(3));

        for c in ['a', 'b', 'c', 'd', 'e', 'f', 'g'] {
            source.emit(&c);
        }
        assert_eq!(
            recorder.values(),
            vec![vec!['a', 'b', 'c'], vec!['d', 'e', 'f']]
        );
    }

    #[test]
    fn test_operator_chain_is_lazy() {
        let spy = SpySource::new();
        let chain = spy
            .emitter
            .map(|v| v + 1)
            .filter(|v| *v > 0)
            .dedupe()
            .scan(|acc, v| acc + v, 0)
            .buffer(2);

        spy.emit(1);
        assert_eq!(spy.connects(), 0);

        let recorder = Recorder::new();
        let sub = recorder.attach(&chain);
        assert_eq!(spy.connects(), 1);

        spy.emit(1);
        spy.emit(2);
        assert_eq!(recorder.values(), vec![vec![2, 5]]);

        sub.unsubscribe().unwrap();
        assert_eq!(spy.disconnects(), 1);
    }
}
