//! Subscription bookkeeping.
//!
//! Every stream is backed by a [`Listenable`] registry:
//! - The first handler connects the registry to its upstream source
//! - Removing the last handler runs the disconnect returned by the source
//! - Revoking a handler twice is an error
//!
//! # Example
//!
//! ```ignore
//! let registry = Listenable::with_source(|emit| {
//!     let sub = parent.listen(move |v| emit.emit(v));
//!     Some(Box::new(move || { let _ = sub.unsubscribe(); }) as Disconnect)
//! });
//!
//! let sub = registry.listen(handler(|v: &i32| println!("got {v}")));
//! registry.emit(&1);
//! sub.unsubscribe()?;
//! ```

mod registry;
mod types;

pub use registry::{Connect, Emit, Listenable};
pub(crate) use types::release;
pub use types::{Disconnect, Subscription};
