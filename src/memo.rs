//! Passive mirror of an emitter's latest value.

use crate::error::{Result, StreamError};
use crate::interop::IntoEmitter;
use crate::subscriptions::Subscription;
use crate::types::Value;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Holds the latest value of a source.
///
/// Unlike operators, a memo subscribes as soon as it is created and stays
/// subscribed until [`dispose`](Memo::dispose). After disposal every
/// operation fails with [`StreamError::MemoDisposed`].
pub struct Memo<T> {
    value: Arc<Mutex<T>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<T: Value + Clone> Memo<T> {
    /// Subscribe to `source` now, starting from `initial`.
    pub fn new<S: IntoEmitter<T>>(source: S, initial: T) -> Self {
        let value = Arc::new(Mutex::new(initial));
        let target = Arc::clone(&value);
        let subscription = source
            .into_emitter()
            .listen(move |latest: &T| *target.lock() = latest.clone());

        Self {
            value,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// The latest value.
    pub fn value(&self) -> Result<T> {
        if self.is_disposed() {
            return Err(StreamError::MemoDisposed);
        }
        Ok(self.value.lock().clone())
    }

    /// Run `f` on a snapshot of the latest value. The memo is not locked
    /// while `f` runs, so `f` may read the memo again.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let current = self.value()?;
        Ok(f(&current))
    }

    pub fn is_disposed(&self) -> bool {
        self.subscription.lock().is_none()
    }

    /// Unsubscribe from the source. Disposing twice is an error.
    pub fn dispose(&self) -> Result<()> {
        let subscription = self
            .subscription
            .lock()
            .take()
            .ok_or(StreamError::MemoDisposed)?;
        subscription.unsubscribe()
    }
}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("disposed", &self.subscription.lock().is_none())
            .finish_non_exhaustive()
    }
}
