//! The subscription registry behind every emitter.

use crate::error::{Result, StreamError};
use crate::types::{Handler, HandlerId, RegistryId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

use super::types::{Disconnect, Subscription};

/// Counter for generating registry IDs.
static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Connects a registry to its upstream source when the first handler arrives.
pub type Connect<T> = Box<dyn Fn(Emit<T>) -> Option<Disconnect> + Send + Sync>;

/// One registered handler.
struct Entry<T> {
    id: HandlerId,
    handler: Handler<T>,
    /// Cleared on removal so an in-flight dispatch skips it.
    live: AtomicBool,
}

/// Handler table and connection state, guarded together so the 0→1 and
/// 1→0 transitions are seen in one order by every thread.
struct State<T> {
    entries: Vec<Arc<Entry<T>>>,
    /// Bumped on every connect and every disconnect.
    generation: u64,
    disconnect: Option<Disconnect>,
    connected: bool,
}

struct Inner<T> {
    id: RegistryId,
    state: Mutex<State<T>>,
    next_handler: AtomicU64,
    connect: Option<Connect<T>>,
}

/// Ledger of live handlers for one stream.
///
/// The first handler to arrive runs the connect callback; removing the last
/// one runs the disconnect it returned. A registry without a connect callback
/// is driven purely through [`emit`](Listenable::emit).
pub struct Listenable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Listenable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Listenable<T> {
    /// Create a registry with no upstream.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a registry that connects lazily through `connect`.
    ///
    /// `connect` receives a weak emit handle for this registry and may return
    /// a [`Disconnect`] to run when the last handler leaves.
    pub fn with_source<F>(connect: F) -> Self
    where
        F: Fn(Emit<T>) -> Option<Disconnect> + Send + Sync + 'static,
    {
        Self::build(Some(Box::new(connect)))
    }

    fn build(connect: Option<Connect<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)),
                state: Mutex::new(State {
                    entries: Vec::new(),
                    generation: 0,
                    disconnect: None,
                    connected: false,
                }),
                next_handler: AtomicU64::new(1),
                connect,
            }),
        }
    }

    /// Process-unique id of this registry.
    pub fn id(&self) -> RegistryId {
        self.inner.id
    }

    /// Register a handler.
    ///
    /// The handler is in place before the upstream connects, so a source that
    /// emits while connecting already reaches it.
    pub fn listen(&self, handler: Handler<T>) -> Subscription {
        let id = HandlerId(self.inner.next_handler.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Entry {
            id,
            handler,
            live: AtomicBool::new(true),
        });

        let generation = {
            let mut state = self.inner.state.lock();
            state.entries.push(entry);
            if state.entries.len() == 1 && self.inner.connect.is_some() {
                state.generation += 1;
                state.connected = true;
                Some(state.generation)
            } else {
                None
            }
        };

        if let Some(generation) = generation {
            self.connect(generation);
        }

        let inner = Arc::clone(&self.inner);
        Subscription::new(move || Listenable { inner: Arc::clone(&inner) }.remove(id))
    }

    /// Invoke every live handler in subscription order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Arc<Entry<T>>> = self.inner.state.lock().entries.clone();
        trace!(registry = %self.inner.id, handlers = snapshot.len(), "dispatch");
        for entry in snapshot {
            if entry.live.load(Ordering::Acquire) {
                (entry.handler)(value);
            }
        }
    }

    /// A weak emit handle for this registry.
    pub fn emitter_handle(&self) -> Emit<T> {
        Emit {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of live handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Whether the upstream source is currently connected.
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    /// Run the connect callback for `generation` without holding the state
    /// lock, then keep its disconnect only if that connection is still current.
    fn connect(&self, generation: u64) {
        let Some(connect) = &self.inner.connect else {
            return;
        };

        debug!(registry = %self.inner.id, generation, "connecting upstream");
        let disconnect = connect(self.emitter_handle());

        let stale = {
            let mut state = self.inner.state.lock();
            if state.generation == generation {
                state.disconnect = disconnect;
                None
            } else {
                disconnect
            }
        };

        // Every handler left while the source was connecting.
        if let Some(disconnect) = stale {
            debug!(registry = %self.inner.id, generation, "handlers left during connect");
            disconnect();
        }
    }

    fn remove(&self, id: HandlerId) -> Result<()> {
        let disconnect = {
            let mut state = self.inner.state.lock();
            let pos = state
                .entries
                .iter()
                .position(|e| e.id == id)
                .ok_or(StreamError::AlreadyUnsubscribed)?;
            let entry = state.entries.remove(pos);
            entry.live.store(false, Ordering::Release);

            if state.entries.is_empty() && state.connected {
                state.generation += 1;
                state.connected = false;
                state.disconnect.take()
            } else {
                None
            }
        };

        if let Some(disconnect) = disconnect {
            debug!(registry = %self.inner.id, "disconnecting upstream");
            disconnect();
        }
        Ok(())
    }
}

impl<T: 'static> Default for Listenable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Weak emit side of a [`Listenable`].
///
/// Held by upstream relays and timers so that a parent never keeps its
/// derived registries alive. Emitting through a handle whose registry is gone
/// does nothing.
pub struct Emit<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for Emit<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: 'static> Emit<T> {
    /// Deliver `value` if the registry still exists.
    pub fn emit(&self, value: &T) {
        if let Some(inner) = self.inner.upgrade() {
            Listenable { inner }.emit(value);
        }
    }

    /// Whether the registry still exists.
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}
