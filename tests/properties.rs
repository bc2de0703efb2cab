//! Property-based tests for stateful operators.
//!
//! 1. dedupe output never holds two equal neighbours and keeps every change.
//! 2. buffer emits only full chunks that concatenate to a prefix of the input.
//! 3. take(n) forwards exactly the first min(n, len) values.
//! 4. scan emits every intermediate fold.
//! 5. combine emits nothing until every source has emitted.

use parking_lot::Mutex;
use proptest::prelude::*;
use ripple::{combine_emitters, create_event_source, Emitter, EventSourcePair, Subscription};
use std::sync::Arc;

// ── Helpers ─────────────────────────────────────────────────────────────

fn record<T: Clone + Send + Sync + 'static>(emitter: &Emitter<T>) -> (Arc<Mutex<Vec<T>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = emitter.listen(move |v: &T| sink.lock().push(v.clone()));
    (seen, sub)
}

fn feed(source: &EventSourcePair<u8>, values: &[u8]) {
    for v in values {
        source.emit(v);
    }
}

fn small_values() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..4, 0..64)
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn dedupe_removes_only_consecutive_repeats(values in small_values()) {
        let source = create_event_source::<u8>(None);
        let (seen, _sub) = record(&source.emitter().dedupe());
        feed(&source, &values);

        let mut expected = values.clone();
        expected.dedup();
        prop_assert_eq!(seen.lock().clone(), expected);
    }

    #[test]
    fn buffer_emits_full_chunks_only(values in small_values(), size in 1usize..8) {
        let source = create_event_source::<u8>(None);
        let (seen, _sub) = record(&source.emitter().buffer(size));
        feed(&source, &values);

        let chunks = seen.lock().clone();
        prop_assert_eq!(chunks.len(), values.len() / size);
        prop_assert!(chunks.iter().all(|chunk| chunk.len() == size));
        let flat: Vec<u8> = chunks.concat();
        prop_assert_eq!(&flat[..], &values[..flat.len()]);
    }

    #[test]
    fn take_forwards_a_prefix(values in small_values(), limit in 0usize..16) {
        let source = create_event_source::<u8>(None);
        let (seen, _sub) = record(&source.emitter().take(limit));
        feed(&source, &values);

        let expected: Vec<u8> = values.iter().copied().take(limit).collect();
        prop_assert_eq!(seen.lock().clone(), expected);
        if values.len() >= limit {
            prop_assert_eq!(source.handler_count(), 0);
        }
    }

    #[test]
    fn scan_emits_running_totals(values in small_values()) {
        let source = create_event_source::<u8>(None);
        let (seen, _sub) = record(&source.emitter().scan(|sum: &u32, v: &u8| sum + u32::from(*v), 0));
        feed(&source, &values);

        let expected: Vec<u32> = values
            .iter()
            .scan(0u32, |sum, v| {
                *sum += u32::from(*v);
                Some(*sum)
            })
            .collect();
        prop_assert_eq!(seen.lock().clone(), expected);
    }

    #[test]
    fn combine_waits_for_every_source(first in small_values(), second in small_values()) {
        let a = create_event_source::<u8>(None);
        let b = create_event_source::<u8>(None);
        let (seen, _sub) = record(&combine_emitters(vec![a.emitter(), b.emitter()]));

        feed(&a, &first);
        prop_assert!(seen.lock().is_empty());
        feed(&b, &second);

        let snapshots = seen.lock().clone();
        if first.is_empty() {
            prop_assert!(snapshots.is_empty());
        } else {
            prop_assert_eq!(snapshots.len(), second.len());
            if let (Some(last), Some(a_last), Some(b_last)) = (snapshots.last(), first.last(), second.last()) {
                prop_assert_eq!(last, &vec![*a_last, *b_last]);
            }
        }
    }
}
