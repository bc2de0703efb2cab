//! Stateful emitter that owns its current value.

use crate::emitter::Emitter;
use crate::subscriptions::Listenable;
use crate::types::Value;
use parking_lot::Mutex;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// An emitter holding a current value, driven by [`next`](SubjectEmitter::next).
///
/// Every new handler first receives the current value synchronously, then
/// each later `next`. A subject has no upstream, so it never disconnects.
///
/// Derefs to [`Emitter`], so the full operator surface is available directly:
///
/// ```ignore
/// let count = SubjectEmitter::new(0);
/// let label = count.map(|n| format!("{n} items"));
/// count.next(3);
/// ```
pub struct SubjectEmitter<T> {
    value: Arc<Mutex<T>>,
    registry: Listenable<T>,
    emitter: Emitter<T>,
}

impl<T> Clone for SubjectEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            registry: self.registry.clone(),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: Value + Clone> SubjectEmitter<T> {
    /// Create a subject holding `initial`.
    pub fn new(initial: T) -> Self {
        let value = Arc::new(Mutex::new(initial));
        let registry = Listenable::new();

        let (current, handlers) = (Arc::clone(&value), registry.clone());
        let emitter = Emitter::new(move |handler| {
            let snapshot = current.lock().clone();
            handler(&snapshot);
            handlers.listen(handler)
        });

        Self {
            value,
            registry,
            emitter,
        }
    }

    /// The current value.
    pub fn value(&self) -> T {
        self.value.lock().clone()
    }

    /// Store `value` and deliver it to every current handler.
    pub fn next(&self, value: T) {
        *self.value.lock() = value.clone();
        self.registry.emit(&value);
    }

    /// Replace the value with `f(current)` and deliver it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.value();
        self.next(f(&current));
    }

    /// The emitter view of this subject.
    pub fn emitter(&self) -> Emitter<T> {
        self.emitter.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.handler_count()
    }
}

impl<T> Deref for SubjectEmitter<T> {
    type Target = Emitter<T>;

    fn deref(&self) -> &Emitter<T> {
        &self.emitter
    }
}

impl<T: fmt::Debug> fmt::Debug for SubjectEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectEmitter")
            .field("value", &*self.value.lock())
            .finish_non_exhaustive()
    }
}
