//! # Ripple
//!
//! A push-based reactive stream engine with lazily connected operator chains.
//!
//! ## Core Concepts
//!
//! - **Emitters**: Handles to subscribe to a stream and chain operators
//! - **Registries**: Handler lists that connect upstream on the first handler
//!   and disconnect on the last
//! - **Subjects**: Emitters owning a current value, replayed to new handlers
//! - **Schedulers**: Injected clocks and timers behind every time-based operator
//!
//! ## Example
//!
//! ```ignore
//! use ripple::{create_event_source, SubjectEmitter};
//!
//! let count = SubjectEmitter::new(0);
//! let sub = count
//!     .map(|n| n * 2)
//!     .dedupe()
//!     .listen(|doubled| println!("{doubled}"));
//!
//! count.next(3);
//! sub.unsubscribe()?;
//!
//! // A source driven by hand
//! let clicks = create_event_source::<(i32, i32)>(None);
//! let first = clicks.emitter().once();
//! clicks.emit(&(10, 20));
//! ```

pub mod combine;
pub mod emitter;
pub mod error;
pub mod events;
pub mod interop;
pub mod memo;
pub mod producers;
pub mod scheduler;
pub mod subject;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use combine::{combine_emitters, CombineSources};
pub use emitter::{create_event_source, Emitter, EventSourcePair};
pub use error::{Result, StreamError};
pub use events::EventHub;
pub use interop::{
    to_event_emitter, AddListenerFn, EventSource, IntoEmitter, RemoveListenerFn, SourceShape,
    SubscribeFn,
};
pub use memo::Memo;
pub use producers::{interval, interval_on, timeout, timeout_on};
pub use scheduler::{
    default_scheduler, set_default_scheduler, ManualScheduler, Scheduler, SchedulerConfig,
    SharedScheduler, Task, ThreadScheduler, TimerHandle,
};
pub use subject::SubjectEmitter;
pub use subscriptions::{Disconnect, Emit, Listenable, Subscription};
pub use types::*;
