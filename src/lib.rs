//! A priority-ordered event loop multiplexing watches (file descriptors),
//! one-shot timeouts, and self-dispatching sources onto a single `poll(2)`
//! call, with a cross-thread wake channel so registrations and a `stop()`
//! from another thread are never stuck behind an indefinite block.
//!
//! Each iteration runs five phases in order: sweep deletions left over
//! from a previous iteration, prepare (ask sources and timeouts if they're
//! already ready, tightening the poll timeout), poll, check (match ready
//! descriptors against watches, give remaining sources one more chance),
//! and dispatch (run every pending callback, timeouts first, then
//! watches, then sources).
//!
//! ```no_run
//! use std::sync::Arc;
//! use priority_event_loop::{Context, EventLoop};
//!
//! # fn build_context() -> Arc<impl Context + 'static> { unimplemented!() }
//! let context = build_context();
//! let event_loop = EventLoop::new(context).expect("wake channel init");
//! event_loop.run(-1);
//! ```

#[macro_use]
mod macros;

mod context;
mod dispatch_source;
mod error;
mod event_loop;
mod fd_table;
mod poll_events;
mod priority;
mod registry;
mod sys;
mod time;
mod timeout;
mod wake;
mod watch;

pub use context::{
    Context, DispatchSourceAddFn, DispatchSourceRemoveFn, SubscriptionToken, TimeoutAddFn,
    TimeoutRemoveFn, WakeupFn, WatchAddFn, WatchRemoveFn,
};
pub use dispatch_source::{DispatchSource, Readiness};
pub use error::EventLoopError;
pub use event_loop::EventLoop;
pub use poll_events::PollEvents;
pub use priority::Priority;
pub use time::monotonic_ms;
pub use timeout::Timeout;
pub use watch::Watch;
