//! The chainable emitter handle and its operators.
//!
//! An [`Emitter`] wraps a listen function. Operators build new emitters whose
//! registries connect to the parent only while they have handlers of their
//! own, so an unused chain costs nothing upstream.
//!
//! Operators are grouped by file:
//! - `operators`: map, filter, tap, dedupe, scan, buffer
//! - `timing`: debounce, throttle, batch, delay
//! - `termination`: once, take, take_while, take_until
//! - `replay`: immediate, cached, or, memo

mod operators;
mod replay;
mod termination;
mod timing;

use crate::subscriptions::{release, Disconnect, Emit, Listenable, Subscription};
use crate::types::{Handler, Value};
use std::fmt;
use std::sync::Arc;

type ListenFn<T> = dyn Fn(Handler<T>) -> Subscription + Send + Sync;

/// Handle through which consumers subscribe to a stream and chain operators.
///
/// Cloning is cheap and yields the same stream.
pub struct Emitter<T> {
    on_listen: Arc<ListenFn<T>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            on_listen: Arc::clone(&self.on_listen),
        }
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

impl<T: Value> Emitter<T> {
    /// Create an emitter from a listen function.
    pub fn new<F>(on_listen: F) -> Self
    where
        F: Fn(Handler<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            on_listen: Arc::new(on_listen),
        }
    }

    /// Create an emitter that registers handlers on `registry`.
    pub fn from_listenable(registry: &Listenable<T>) -> Self {
        let registry = registry.clone();
        Self::new(move |handler| registry.listen(handler))
    }

    /// Register a function to receive emitted values.
    pub fn listen<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.listen_handler(Arc::new(f))
    }

    /// Alias of [`listen`](Emitter::listen).
    pub fn apply<F>(&self, f: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.listen(f)
    }

    /// Register an existing handler, keeping its identity.
    pub fn listen_handler(&self, handler: Handler<T>) -> Subscription {
        (self.on_listen)(handler)
    }

    /// Build a derived emitter from a relay function.
    ///
    /// The derived emitter owns a fresh registry. Its first handler subscribes
    /// it to `self` with a relay that calls `relay(value, emit)`; its last
    /// handler leaving unsubscribes it again. The relay decides what, if
    /// anything, to emit for each parent value.
    pub fn transform<R, F>(&self, relay: F) -> Emitter<R>
    where
        R: Value,
        F: Fn(&T, &Emit<R>) + Send + Sync + 'static,
    {
        let parent = self.clone();
        let relay = Arc::new(relay);
        let registry = Listenable::with_source(move |emit: Emit<R>| {
            let relay = Arc::clone(&relay);
            let upstream = parent.listen(move |value: &T| relay(value, &emit));
            Some(Box::new(move || release(upstream, "transform")) as Disconnect)
        });
        Emitter::from_listenable(&registry)
    }

    /// Pass this emitter to `branch` and return it, so side chains can be
    /// declared without breaking a fluent chain.
    ///
    /// ```ignore
    /// progress
    ///     .fork(|branch| {
    ///         branch.map(|p| format!("Loading: {p}%")).apply(set_title);
    ///     })
    ///     .apply(set_width);
    /// ```
    pub fn fork<F>(&self, branch: F) -> &Self
    where
        F: FnOnce(&Self),
    {
        branch(self);
        self
    }
}

/// A manually driven stream: the emit side plus its emitter.
pub struct EventSourcePair<T> {
    registry: Listenable<T>,
    emitter: Emitter<T>,
}

impl<T> Clone for EventSourcePair<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: Value> EventSourcePair<T> {
    /// Deliver a value to every current handler.
    pub fn emit(&self, value: &T) {
        self.registry.emit(value);
    }

    /// The emitter side of the pair.
    pub fn emitter(&self) -> Emitter<T> {
        self.emitter.clone()
    }

    /// Number of handlers attached to the emitter.
    pub fn handler_count(&self) -> usize {
        self.registry.handler_count()
    }
}

/// Create a linked emitter and emit function.
///
/// `initial_handler`, when given, is attached for the lifetime of the source.
///
/// ```ignore
/// let submits = create_event_source(Some(handler(|data: &Form| save(data))));
/// form.on_submit(move |data| submits.emit(&data));
/// ```
pub fn create_event_source<T: Value>(initial_handler: Option<Handler<T>>) -> EventSourcePair<T> {
    let registry = Listenable::new();
    if let Some(handler) = initial_handler {
        // Permanent; the subscription is intentionally never revoked.
        let _permanent = registry.listen(handler);
    }
    let emitter = Emitter::from_listenable(&registry);
    EventSourcePair { registry, emitter }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// Collects every value delivered to it.
    #[derive(Clone)]
    pub struct Recorder<T> {
        seen: Arc<Mutex<Vec<T>>>,
    }

    impl<T: Value + Clone> Recorder<T> {
        pub fn new() -> Self {
            Self {
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn attach(&self, emitter: &Emitter<T>) -> Subscription {
            let seen = Arc::clone(&self.seen);
            emitter.listen(move |v: &T| seen.lock().push(v.clone()))
        }

        pub fn values(&self) -> Vec<T> {
            self.seen.lock().clone()
        }
    }

    /// A source that counts connects and disconnects.
    pub struct SpySource {
        pub pair: EventSourcePair<i32>,
        pub emitter: Emitter<i32>,
        pub connects: Arc<Mutex<usize>>,
        pub disconnects: Arc<Mutex<usize>>,
    }

    impl SpySource {
        pub fn new() -> Self {
            let pair = create_event_source::<i32>(None);
            let connects = Arc::new(Mutex::new(0));
            let disconnects = Arc::new(Mutex::new(0));
            let (inner, c, d) = (pair.emitter(), connects.clone(), disconnects.clone());
            let registry = Listenable::with_source(move |emit: Emit<i32>| {
                *c.lock() += 1;
                let upstream = inner.listen(move |v: &i32| emit.emit(v));
                let d = d.clone();
                Some(Box::new(move || {
                    *d.lock() += 1;
                    release(upstream, "spy");
                }) as Disconnect)
            });
            Self {
                pair,
                emitter: Emitter::from_listenable(&registry),
                connects,
                disconnects,
            }
        }

        pub fn emit(&self, value: i32) {
            self.pair.emit(&value);
        }

        pub fn connects(&self) -> usize {
            *self.connects.lock()
        }

        pub fn disconnects(&self) -> usize {
            *self.disconnects.lock()
        }
    }
}
