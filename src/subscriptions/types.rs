//! Subscription handles returned by every `listen` call.

use crate::error::{Result, StreamError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Callback run when a registry loses its last handler.
pub type Disconnect = Box<dyn FnOnce() + Send>;

type Revoke = dyn Fn() -> Result<()> + Send + Sync;

/// Revocation handle for one handler.
///
/// The first [`unsubscribe`](Subscription::unsubscribe) stops delivery and, if
/// it removed the last handler of a registry, disconnects that registry from
/// its upstream. Any later call returns [`StreamError::AlreadyUnsubscribed`].
///
/// Clones share the same revocation. Dropping a subscription leaves the
/// handler registered.
#[derive(Clone)]
#[must_use = "dropping a Subscription keeps the handler registered; keep it to unsubscribe"]
pub struct Subscription {
    revoke: Arc<Revoke>,
}

impl Subscription {
    /// Create a subscription from a revocation that reports its own errors.
    pub fn new<F>(revoke: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self {
            revoke: Arc::new(revoke),
        }
    }

    /// Create a subscription from a one-shot callback.
    ///
    /// The callback runs on the first `unsubscribe`; later calls fail.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let slot: Mutex<Option<Box<dyn FnOnce() + Send>>> = Mutex::new(Some(Box::new(f)));
        Self::new(move || {
            let f = slot.lock().take().ok_or(StreamError::AlreadyUnsubscribed)?;
            f();
            Ok(())
        })
    }

    /// Combine several subscriptions into one that revokes all of them.
    ///
    /// Every inner subscription is attempted; the first error is returned.
    pub fn all(subscriptions: Vec<Subscription>) -> Self {
        let slot = Mutex::new(Some(subscriptions));
        Self::new(move || {
            let subs = slot.lock().take().ok_or(StreamError::AlreadyUnsubscribed)?;
            let mut first_err = None;
            for sub in subs {
                if let Err(e) = sub.unsubscribe() {
                    first_err.get_or_insert(e);
                }
            }
            first_err.map_or(Ok(()), Err)
        })
    }

    /// Revoke the handler.
    pub fn unsubscribe(&self) -> Result<()> {
        (self.revoke)()
    }

    /// Returns true if both handles revoke the same subscription.
    pub fn same_as(&self, other: &Subscription) -> bool {
        crate::types::same_handler(&self.revoke, &other.revoke)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Unsubscribe from inside the engine, where a failure means a bookkeeping bug
/// rather than caller misuse.
pub(crate) fn release(subscription: Subscription, context: &'static str) {
    if let Err(e) = subscription.unsubscribe() {
        tracing::warn!(context, error = %e, "internal unsubscribe failed");
    }
}
