//! Adapting foreign push sources into emitters.
//!
//! Anything that can deliver values to a callback can be described as a
//! [`SourceShape`] by the capabilities it exposes. [`to_event_emitter`] picks
//! the first usable capability and wraps it in a lazily connected emitter, so
//! the foreign source sees a single registration no matter how many handlers
//! listen downstream.

use crate::emitter::{EventSourcePair, Emitter};
use crate::error::{Result, StreamError};
use crate::subject::SubjectEmitter;
use crate::subscriptions::{release, Disconnect, Emit, Listenable, Subscription};
use crate::types::{Handler, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Conversion into an [`Emitter`], accepted by every combinator.
pub trait IntoEmitter<T> {
    fn into_emitter(self) -> Emitter<T>;
}

impl<T> IntoEmitter<T> for Emitter<T> {
    fn into_emitter(self) -> Emitter<T> {
        self
    }
}

impl<T> IntoEmitter<T> for &Emitter<T> {
    fn into_emitter(self) -> Emitter<T> {
        self.clone()
    }
}

impl<T: Value + Clone> IntoEmitter<T> for SubjectEmitter<T> {
    fn into_emitter(self) -> Emitter<T> {
        self.emitter()
    }
}

impl<T: Value + Clone> IntoEmitter<T> for &SubjectEmitter<T> {
    fn into_emitter(self) -> Emitter<T> {
        self.emitter()
    }
}

impl<T: Value> IntoEmitter<T> for EventSourcePair<T> {
    fn into_emitter(self) -> Emitter<T> {
        self.emitter()
    }
}

impl<T: Value> IntoEmitter<T> for &EventSourcePair<T> {
    fn into_emitter(self) -> Emitter<T> {
        self.emitter()
    }
}

/// Registers a handler and returns its subscription.
pub type SubscribeFn<T> = Arc<dyn Fn(Handler<T>) -> Subscription + Send + Sync>;

/// Registers a handler for a named event. May return its own subscription.
pub type AddListenerFn<T> = Arc<dyn Fn(&str, Handler<T>) -> Option<Subscription> + Send + Sync>;

/// Removes a handler previously registered for a named event.
pub type RemoveListenerFn<T> = Arc<dyn Fn(&str, &Handler<T>) + Send + Sync>;

/// A foreign source described by the registration methods it offers.
pub struct SourceShape<T> {
    subscribe: Option<SubscribeFn<T>>,
    listen: Option<SubscribeFn<T>>,
    on: Option<AddListenerFn<T>>,
    off: Option<RemoveListenerFn<T>>,
    add_event_listener: Option<AddListenerFn<T>>,
    remove_event_listener: Option<RemoveListenerFn<T>>,
}

impl<T> Clone for SourceShape<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe: self.subscribe.clone(),
            listen: self.listen.clone(),
            on: self.on.clone(),
            off: self.off.clone(),
            add_event_listener: self.add_event_listener.clone(),
            remove_event_listener: self.remove_event_listener.clone(),
        }
    }
}

impl<T> Default for SourceShape<T> {
    fn default() -> Self {
        Self {
            subscribe: None,
            listen: None,
            on: None,
            off: None,
            add_event_listener: None,
            remove_event_listener: None,
        }
    }
}

impl<T> SourceShape<T> {
    /// A shape with no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `subscribe(handler)` capability.
    pub fn with_subscribe<F>(mut self, f: F) -> Self
    where
        F: Fn(Handler<T>) -> Subscription + Send + Sync + 'static,
    {
        self.subscribe = Some(Arc::new(f));
        self
    }

    /// Add a `listen(handler)` capability.
    pub fn with_listen<F>(mut self, f: F) -> Self
    where
        F: Fn(Handler<T>) -> Subscription + Send + Sync + 'static,
    {
        self.listen = Some(Arc::new(f));
        self
    }

    /// Add an `on(name, handler)` capability.
    pub fn with_on<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Handler<T>) -> Option<Subscription> + Send + Sync + 'static,
    {
        self.on = Some(Arc::new(f));
        self
    }

    /// Add the `off(name, handler)` remover paired with `on`.
    pub fn with_off<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Handler<T>) + Send + Sync + 'static,
    {
        self.off = Some(Arc::new(f));
        self
    }

    /// Add an `add_event_listener(name, handler)` capability.
    pub fn with_add_event_listener<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Handler<T>) -> Option<Subscription> + Send + Sync + 'static,
    {
        self.add_event_listener = Some(Arc::new(f));
        self
    }

    /// Add the remover paired with `add_event_listener`.
    pub fn with_remove_event_listener<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &Handler<T>) + Send + Sync + 'static,
    {
        self.remove_event_listener = Some(Arc::new(f));
        self
    }

    /// Names of the capabilities this shape provides.
    pub fn describe(&self) -> Vec<&'static str> {
        [
            ("subscribe", self.subscribe.is_some()),
            ("listen", self.listen.is_some()),
            ("on", self.on.is_some()),
            ("off", self.off.is_some()),
            ("add_event_listener", self.add_event_listener.is_some()),
            ("remove_event_listener", self.remove_event_listener.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, present)| present.then_some(name))
        .collect()
    }
}

impl<T> fmt::Debug for SourceShape<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceShape")
            .field("capabilities", &self.describe())
            .finish()
    }
}

/// Input to [`to_event_emitter`].
pub enum EventSource<T> {
    /// Already an emitter; used as is.
    Emitter(Emitter<T>),
    /// A foreign source to adapt.
    Shape(SourceShape<T>),
}

impl<T> From<Emitter<T>> for EventSource<T> {
    fn from(emitter: Emitter<T>) -> Self {
        EventSource::Emitter(emitter)
    }
}

impl<T> From<&Emitter<T>> for EventSource<T> {
    fn from(emitter: &Emitter<T>) -> Self {
        EventSource::Emitter(emitter.clone())
    }
}

impl<T> From<SourceShape<T>> for EventSource<T> {
    fn from(shape: SourceShape<T>) -> Self {
        EventSource::Shape(shape)
    }
}

/// Turn `source` into an [`Emitter`].
///
/// Emitters pass through unchanged. For a shape, with `event_name` given,
/// `add_event_listener` is tried first, then `on`; after that `subscribe`,
/// then `listen`. Listener-style capabilities are ignored without an event
/// name.
///
/// ```ignore
/// let clicks = to_event_emitter(button.shape(), Some("click"))?;
/// ```
pub fn to_event_emitter<T: Value>(
    source: impl Into<EventSource<T>>,
    event_name: Option<&str>,
) -> Result<Emitter<T>> {
    let shape = match source.into() {
        EventSource::Emitter(emitter) => return Ok(emitter),
        EventSource::Shape(shape) => shape,
    };

    if let Some(name) = event_name {
        let listener = shape
            .add_event_listener
            .clone()
            .map(|add| (add, shape.remove_event_listener.clone()))
            .or_else(|| shape.on.clone().map(|on| (on, shape.off.clone())));
        if let Some((add, remove)) = listener {
            debug!(event = name, "adapting listener source");
            return Ok(listener_emitter(name.to_string(), add, remove));
        }
    }

    match shape.subscribe.clone().or_else(|| shape.listen.clone()) {
        Some(subscribe) => Ok(subscribed_emitter(subscribe)),
        None => Err(StreamError::InvalidSource(format!(
            "no usable capability (event name: {}, found: [{}])",
            event_name.unwrap_or("none"),
            shape.describe().join(", ")
        ))),
    }
}

fn relay_to<T: Value>(emit: Emit<T>) -> Handler<T> {
    Arc::new(move |value: &T| emit.emit(value))
}

fn subscribed_emitter<T: Value>(subscribe: SubscribeFn<T>) -> Emitter<T> {
    let registry = Listenable::with_source(move |emit: Emit<T>| {
        let upstream = subscribe(relay_to(emit));
        Some(Box::new(move || release(upstream, "to_event_emitter")) as Disconnect)
    });
    Emitter::from_listenable(&registry)
}

fn listener_emitter<T: Value>(
    name: String,
    add: AddListenerFn<T>,
    remove: Option<RemoveListenerFn<T>>,
) -> Emitter<T> {
    let registry = Listenable::with_source(move |emit: Emit<T>| {
        let relay = relay_to(emit);
        if let Some(upstream) = add(&name, Arc::clone(&relay)) {
            return Some(Box::new(move || release(upstream, "to_event_emitter")) as Disconnect);
        }
        match &remove {
            Some(remove) => {
                let (remove, name) = (Arc::clone(remove), name.clone());
                Some(Box::new(move || remove(&name, &relay)) as Disconnect)
            }
            None => {
                warn!(event = %name, "listener source has no remover; it will stay registered");
                None
            }
        }
    });
    Emitter::from_listenable(&registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::create_event_source;
    use crate::emitter::test_support::Recorder;
    use crate::types::same_handler;
    use parking_lot::Mutex;

    /// A foreign event target keeping handlers per event name.
    #[derive(Clone, Default)]
    struct Target {
        listeners: Arc<Mutex<Vec<(String, Handler<i32>)>>>,
    }

    impl Target {
        fn fire(&self, name: &str, value: i32) {
            let matching: Vec<Handler<i32>> = self
                .listeners
                .lock()
                .iter()
                .filter(|(event, _)| event == name)
                .map(|(_, h)| Arc::clone(h))
                .collect();
            for h in matching {
                h(&value);
            }
        }

        fn count(&self) -> usize {
            self.listeners.lock().len()
        }

        fn adder(&self) -> impl Fn(&str, Handler<i32>) -> Option<Subscription> + Send + Sync {
            let listeners = Arc::clone(&self.listeners);
            move |name: &str, h: Handler<i32>| {
                listeners.lock().push((name.to_string(), h));
                None
            }
        }

        fn remover(&self) -> impl Fn(&str, &Handler<i32>) + Send + Sync {
            let listeners = Arc::clone(&self.listeners);
            move |name: &str, h: &Handler<i32>| {
                listeners
                    .lock()
                    .retain(|(event, other)| !(event == name && same_handler(other, h)));
            }
        }
    }

    #[test]
    fn test_emitter_passes_through() {
        let pair = create_event_source::<i32>(None);
        let adapted = to_event_emitter(pair.emitter(), None).unwrap();
        let recorder = Recorder::new();
        let _sub = recorder.attach(&adapted);
        pair.emit(&3);
        assert_eq!(recorder.values(), vec![3]);
    }

    #[test]
    fn test_add_event_listener_with_remover() {
        let target = Target::default();
        let shape = SourceShape::new()
            .with_add_event_listener(target.adder())
            .with_remove_event_listener(target.remover());
        let clicks = to_event_emitter(shape, Some("click")).unwrap();
        assert_eq!(target.count(), 0);

        let first = Recorder::new();
        let second = Recorder::new();
        let a = first.attach(&clicks);
        let b = second.attach(&clicks);
        assert_eq!(target.count(), 1);

        target.fire("click", 1);
        target.fire("hover", 2);
        assert_eq!(first.values(), vec![1]);
        assert_eq!(second.values(), vec![1]);

        a.unsubscribe().unwrap();
        b.unsubscribe().unwrap();
        assert_eq!(target.count(), 0);
    }

    #[test]
    fn test_add_event_listener_preferred_over_on() {
        let preferred = Target::default();
        let fallback = Target::default();
        let shape = SourceShape::new()
            .with_on(fallback.adder())
            .with_add_event_listener(preferred.adder());
        let emitter = to_event_emitter(shape, Some("tick")).unwrap();
        let _sub = emitter.listen(|_| {});

        assert_eq!(preferred.count(), 1);
        assert_eq!(fallback.count(), 0);
    }

    #[test]
    fn test_on_off_pair() {
        let target = Target::default();
        let shape = SourceShape::new()
            .with_on(target.adder())
            .with_off(target.remover());
        let emitter = to_event_emitter(shape, Some("data")).unwrap();

        let recorder = Recorder::new();
        let sub = recorder.attach(&emitter);
        target.fire("data", 7);
        sub.unsubscribe().unwrap();
        target.fire("data", 8);

        assert_eq!(recorder.values(), vec![7]);
        assert_eq!(target.count(), 0);
    }

    #[test]
    fn test_on_without_off_stays_registered() {
        let target = Target::default();
        let shape = SourceShape::new().with_on(target.adder());
        let emitter = to_event_emitter(shape, Some("data")).unwrap();

        let recorder = Recorder::new();
        let sub = recorder.attach(&emitter);
        target.fire("data", 1);
        sub.unsubscribe().unwrap();
        target.fire("data", 2);

        assert_eq!(recorder.values(), vec![1]);
        assert_eq!(target.count(), 1);
    }

    #[test]
    fn test_listener_returning_subscription() {
        let pair = create_event_source::<i32>(None);
        let inner = pair.emitter();
        let shape = SourceShape::new().with_add_event_listener(move |_: &str, h| {
            Some(inner.listen_handler(h))
        });
        let emitter = to_event_emitter(shape, Some("any")).unwrap();

        let sub = emitter.listen(|_| {});
        assert_eq!(pair.handler_count(), 1);
        sub.unsubscribe().unwrap();
        assert_eq!(pair.handler_count(), 0);
    }

    #[test]
    fn test_subscribe_then_listen() {
        let pair = create_event_source::<i32>(None);
        let (a, b) = (pair.emitter(), pair.emitter());
        let shape = SourceShape::new()
            .with_listen(move |h| a.listen_handler(h))
            .with_subscribe(move |h| b.listen_handler(h));
        let emitter = to_event_emitter(shape, None).unwrap();

        let recorder = Recorder::new();
        let sub = recorder.attach(&emitter);
        pair.emit(&5);
        assert_eq!(recorder.values(), vec![5]);
        assert_eq!(pair.handler_count(), 1);

        sub.unsubscribe().unwrap();
        assert_eq!(pair.handler_count(), 0);
    }

    #[test]
    fn test_listener_capability_needs_event_name() {
        let target = Target::default();
        let shape = SourceShape::new().with_add_event_listener(target.adder());
        let err = to_event_emitter(shape, None).unwrap_err();

        match err {
            StreamError::InvalidSource(message) => {
                assert!(message.contains("add_event_listener"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_shape_is_invalid() {
        let shape: SourceShape<i32> = SourceShape::new();
        assert!(shape.describe().is_empty());
        assert!(matches!(
            to_event_emitter(shape, Some("click")),
            Err(StreamError::InvalidSource(_))
        ));
    }
}
