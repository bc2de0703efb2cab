//! Fan-in of several emitters into one snapshot stream.
//!
//! A combined emitter keeps one slot per source. Nothing is emitted until
//! every slot holds a value; after that each source emission updates its slot
//! and emits the whole snapshot. Slots survive reconnection, so a source that
//! emitted during an earlier connection still counts as filled.

use crate::emitter::Emitter;
use crate::interop::IntoEmitter;
use crate::subscriptions::{release, Disconnect, Emit, Listenable, Subscription};
use crate::types::Value;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

/// Collections of emitters that can be combined.
pub trait CombineSources {
    /// Snapshot type emitted once every source has a value.
    type Output: Value;

    fn combine(self) -> Emitter<Self::Output>;
}

/// Combine an ordered list or keyed map of emitters.
///
/// ```ignore
/// let form = combine_emitters(BTreeMap::from([
///     ("name", name.emitter()),
///     ("email", email.emitter()),
/// ]));
/// ```
pub fn combine_emitters<S: CombineSources>(sources: S) -> Emitter<S::Output> {
    sources.combine()
}

fn combine_slots<T: Value + Clone>(sources: Vec<Emitter<T>>) -> Emitter<Vec<T>> {
    let slots: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new(vec![None; sources.len()]));
    let registry = Listenable::with_source(move |emit: Emit<Vec<T>>| {
        if sources.is_empty() {
            return None;
        }

        let upstream = sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let (slots, emit) = (Arc::clone(&slots), emit.clone());
                source.listen(move |value: &T| {
                    let snapshot = {
                        let mut slots = slots.lock();
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(value.clone());
                        }
                        slots.iter().cloned().collect::<Option<Vec<T>>>()
                    };
                    if let Some(snapshot) = snapshot {
                        emit.emit(&snapshot);
                    }
                })
            })
            .collect();

        let upstream = Subscription::all(upstream);
        Some(Box::new(move || release(upstream, "combine")) as Disconnect)
    });
    Emitter::from_listenable(&registry)
}

impl<T: Value + Clone> CombineSources for Vec<Emitter<T>> {
    type Output = Vec<T>;

    fn combine(self) -> Emitter<Vec<T>> {
        combine_slots(self)
    }
}

impl<T: Value + Clone, const N: usize> CombineSources for [Emitter<T>; N] {
    type Output = Vec<T>;

    fn combine(self) -> Emitter<Vec<T>> {
        combine_slots(self.into())
    }
}

impl<K, T> CombineSources for BTreeMap<K, Emitter<T>>
where
    K: Value + Clone + Ord,
    T: Value + Clone,
{
    type Output = BTreeMap<K, T>;

    fn combine(self) -> Emitter<BTreeMap<K, T>> {
        let (keys, sources): (Vec<K>, Vec<Emitter<T>>) = self.into_iter().unzip();
        combine_slots(sources).map(move |values: &Vec<T>| {
            keys.iter().cloned().zip(values.iter().cloned()).collect()
        })
    }
}

impl<K, T> CombineSources for HashMap<K, Emitter<T>>
where
    K: Value + Clone + Eq + Hash,
    T: Value + Clone,
{
    type Output = HashMap<K, T>;

    fn combine(self) -> Emitter<HashMap<K, T>> {
        let (keys, sources): (Vec<K>, Vec<Emitter<T>>) = self.into_iter().unzip();
        combine_slots(sources).map(move |values: &Vec<T>| {
            keys.iter().cloned().zip(values.iter().cloned()).collect()
        })
    }
}

/// One side of a two-way combine.
#[derive(Clone)]
enum Side<A, B> {
    Left(A),
    Right(B),
}

impl<T: Value + Clone> Emitter<T> {
    /// Combine with an emitter of another type into pairs.
    ///
    /// Emits once both sides have a value, then on every emission of either.
    pub fn combine_with<U, S>(&self, other: S) -> Emitter<(T, U)>
    where
        U: Value + Clone,
        S: IntoEmitter<U>,
    {
        let left = self.map(|a: &T| Side::<T, U>::Left(a.clone()));
        let right = other.into_emitter().map(|b: &U| Side::<T, U>::Right(b.clone()));
        combine_slots(vec![left, right]).transform(|sides: &Vec<Side<T, U>>, emit: &Emit<(T, U)>| {
            if let [Side::Left(a), Side::Right(b)] = sides.as_slice() {
                emit.emit(&(a.clone(), b.clone()));
            }
        })
    }
}
