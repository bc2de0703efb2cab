//! Named-event table for components that expose several event streams.

use crate::emitter::Emitter;
use crate::interop::SourceShape;
use crate::subscriptions::{release, Listenable, Subscription};
use crate::types::{same_handler, Handler, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

struct Channel<T> {
    registry: Listenable<T>,
    emitter: Emitter<T>,
    /// Handlers added through `add_event_listener`, for removal by identity.
    listeners: Vec<(Handler<T>, Subscription)>,
}

/// A table of event streams keyed by name.
///
/// Each name gets its own registry on first use and keeps it for the life of
/// the hub, so the emitter returned for a name is always the same stream.
///
/// ```ignore
/// let hub = EventHub::<Key>::new();
/// let enter = hub.events("keydown").filter(|k| *k == Key::Enter);
/// hub.emit("keydown", &Key::Enter);
/// ```
pub struct EventHub<T> {
    channels: Arc<Mutex<HashMap<String, Channel<T>>>>,
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl<T: Value> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Value> EventHub<T> {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn channel<R>(&self, name: &str, f: impl FnOnce(&mut Channel<T>) -> R) -> R {
        let mut channels = self.channels.lock();
        let channel = channels.entry(name.to_string()).or_insert_with(|| {
            let registry = Listenable::new();
            let emitter = Emitter::from_listenable(&registry);
            Channel {
                registry,
                emitter,
                listeners: Vec::new(),
            }
        });
        f(channel)
    }

    /// The emitter for `name`.
    pub fn events(&self, name: &str) -> Emitter<T> {
        self.channel(name, |channel| channel.emitter.clone())
    }

    /// Deliver `value` to every handler of `name`.
    pub fn emit(&self, name: &str, value: &T) {
        let registry = {
            let channels = self.channels.lock();
            match channels.get(name) {
                Some(channel) => channel.registry.clone(),
                None => {
                    trace!(event = name, "no listeners");
                    return;
                }
            }
        };
        registry.emit(value);
    }

    /// Attach `handler` to `name`, remembering it for
    /// [`remove_event_listener`](EventHub::remove_event_listener).
    pub fn add_event_listener(&self, name: &str, handler: Handler<T>) -> Subscription {
        let inner = self.events(name).listen_handler(Arc::clone(&handler));
        self.channel(name, |channel| {
            channel.listeners.push((handler, inner.clone()));
        });

        let (hub, name) = (self.clone(), name.to_string());
        Subscription::new(move || {
            hub.channel(&name, |channel| {
                channel.listeners.retain(|(_, known)| !known.same_as(&inner));
            });
            inner.unsubscribe()
        })
    }

    /// Detach a handler added with `add_event_listener`. Unknown handlers are
    /// ignored.
    pub fn remove_event_listener(&self, name: &str, handler: &Handler<T>) {
        let removed = {
            let mut channels = self.channels.lock();
            channels.get_mut(name).and_then(|channel| {
                let position = channel
                    .listeners
                    .iter()
                    .position(|(known, _)| same_handler(known, handler))?;
                Some(channel.listeners.remove(position).1)
            })
        };
        if let Some(subscription) = removed {
            release(subscription, "remove_event_listener");
        }
    }

    /// Number of handlers currently attached to `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.channels
            .lock()
            .get(name)
            .map_or(0, |channel| channel.registry.handler_count())
    }

    /// Names that have been used so far, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Describe this hub as a listener-style source.
    pub fn shape(&self) -> SourceShape<T> {
        let (adder, remover) = (self.clone(), self.clone());
        SourceShape::new()
            .with_add_event_listener(move |name: &str, handler: Handler<T>| {
                Some(adder.add_event_listener(name, handler))
            })
            .with_remove_event_listener(move |name: &str, handler: &Handler<T>| {
                remover.remove_event_listener(name, handler)
            })
    }
}

impl<T> fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.lock();
        f.debug_struct("EventHub")
            .field("events", &channels.len())
            .finish()
    }
}
