//! Core types for the stream engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Marker for payloads that can flow through an emitter.
///
/// Values may be delivered from the timer thread, so they must be shareable.
pub trait Value: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Value for T {}

/// A callback receiving each emitted value by reference.
///
/// Identity is the `Arc` allocation: two clones of the same handler are the
/// same handler, two separately boxed closures are not.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler<T, F>(f: F) -> Handler<T>
where
    F: Fn(&T) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Returns true if both handlers point at the same callback.
pub fn same_handler<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    // Compare data pointers only; vtable pointers may differ across codegen units.
    std::ptr::eq(Arc::as_ptr(a) as *const u8, Arc::as_ptr(b) as *const u8)
}

/// Unique identifier for a subscription registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(pub u64);

impl fmt::Debug for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegistryId({})", self.0)
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one handler inside a registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

impl fmt::Debug for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerId({})", self.0)
    }
}

/// A span of time accepted by timer-based operators and producers.
///
/// Converts from a raw millisecond count or from a [`Duration`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TimeSpan(pub Duration);

impl TimeSpan {
    /// A span of `ms` milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        TimeSpan(Duration::from_millis(ms))
    }

    pub fn as_duration(self) -> Duration {
        self.0
    }

    pub fn as_millis(self) -> u128 {
        self.0.as_millis()
    }
}

impl From<u64> for TimeSpan {
    fn from(ms: u64) -> Self {
        TimeSpan::from_millis(ms)
    }
}

impl From<u32> for TimeSpan {
    fn from(ms: u32) -> Self {
        TimeSpan::from_millis(u64::from(ms))
    }
}

impl From<Duration> for TimeSpan {
    fn from(d: Duration) -> Self {
        TimeSpan(d)
    }
}

impl From<TimeSpan> for Duration {
    fn from(span: TimeSpan) -> Self {
        span.0
    }
}

impl fmt::Debug for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSpan({}ms)", self.0.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_span_conversions() {
        assert_eq!(TimeSpan::from(250u64).as_duration(), Duration::from_millis(250));
        assert_eq!(TimeSpan::from(7u32).as_millis(), 7);
        assert_eq!(
            TimeSpan::from(Duration::from_secs(2)),
            TimeSpan::from_millis(2000)
        );
    }

    #[test]
    fn test_handler_identity() {
        let a: Handler<i32> = handler(|_| {});
        let b = a.clone();
        let c: Handler<i32> = handler(|_| {});
        assert!(same_handler(&a, &b));
        assert!(!same_handler(&a, &c));
    }
}
