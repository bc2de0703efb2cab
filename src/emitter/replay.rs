//! Replay, merge, and memoization.

use crate::interop::IntoEmitter;
use crate::memo::Memo;
use crate::subscriptions::{release, Disconnect, Emit, Listenable, Subscription};
use crate::types::Value;
use parking_lot::Mutex;
use std::sync::Arc;

use super::Emitter;

impl<T: Value> Emitter<T> {
    /// Deliver `value` to every new handler as it subscribes, then forward
    /// parent emissions.
    pub fn immediate(&self, value: T) -> Emitter<T> {
        let parent = self.clone();
        Emitter::new(move |handler| {
            handler(&value);
            parent.listen_handler(handler)
        })
    }

    /// Forward parent emissions and replay the latest one to new handlers.
    ///
    /// Nothing is replayed until a value has passed through while connected.
    pub fn cached(&self) -> Emitter<T>
    where
        T: Clone,
    {
        let parent = self.clone();
        let cache: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let store = Arc::clone(&cache);
        let registry = Listenable::with_source(move |emit: Emit<T>| {
            let store = Arc::clone(&store);
            let upstream = parent.listen(move |value: &T| {
                *store.lock() = Some(value.clone());
                emit.emit(value);
            });
            Some(Box::new(move || release(upstream, "cached")) as Disconnect)
        });

        Emitter::new(move |handler| {
            let latest = cache.lock().clone();
            if let Some(value) = latest {
                handler(&value);
            }
            registry.listen(handler)
        })
    }

    /// Forward emissions from this emitter and every one of `others`.
    ///
    /// Each handler is subscribed to all sources; its subscription revokes
    /// them together.
    pub fn or<I, S>(&self, others: I) -> Emitter<T>
    where
        I: IntoIterator<Item = S>,
        S: IntoEmitter<T>,
    {
        let sources: Vec<Emitter<T>> = std::iter::once(self.clone())
            .chain(others.into_iter().map(IntoEmitter::into_emitter))
            .collect();
        Emitter::new(move |handler| {
            Subscription::all(
                sources
                    .iter()
                    .map(|source| source.listen_handler(Arc::clone(&handler)))
                    .collect(),
            )
        })
    }

    /// Mirror the latest value into a [`Memo`], subscribing right away.
    pub fn memo(&self, initial: T) -> Memo<T>
    where
        T: Clone,
    {
        Memo::new(self.clone(), initial)
    }

    /// Like [`memo`](Emitter::memo) with no value until the first emission.
    pub fn memo_latest(&self) -> Memo<Option<T>>
    where
        T: Clone,
    {
        Memo::new(self.map(|value: &T| Some(value.clone())), None)
    }
}
