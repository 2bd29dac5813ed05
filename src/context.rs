use std::sync::Arc;

use crate::{DispatchSource, Priority, Timeout, Watch};

/// Handle returned by a `subscribe_*` call and handed back to the matching
/// `unsubscribe_*` at teardown.
///
/// The wrapped id is assigned by whichever [`Context`] implementation
/// issued it; an `EventLoop` only ever stores and echoes tokens back, the
/// same way `mio::Token` is a plain id its owner hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(pub u64);

pub type DispatchSourceAddFn = Box<dyn Fn(Arc<dyn DispatchSource>, Priority) + Send + Sync>;
pub type DispatchSourceRemoveFn = Box<dyn Fn(Arc<dyn DispatchSource>) + Send + Sync>;
pub type WatchAddFn = Box<dyn Fn(Arc<dyn Watch>, Priority) + Send + Sync>;
pub type WatchRemoveFn = Box<dyn Fn(Arc<dyn Watch>) + Send + Sync>;
pub type TimeoutAddFn = Box<dyn Fn(Arc<dyn Timeout>, Priority) + Send + Sync>;
pub type TimeoutRemoveFn = Box<dyn Fn(Arc<dyn Timeout>) + Send + Sync>;
pub type WakeupFn = Box<dyn Fn() + Send + Sync>;

/// The external collaborator an [`EventLoop`](crate::EventLoop) binds to.
///
/// An event loop never creates watches, timeouts, or dispatch sources on
/// its own; it only learns about them through these four
/// subscribe/unsubscribe pairs. A typical implementation lives alongside
/// whatever produces the sources (a transport, an RPC runtime, a test
/// harness) and is out of scope for this crate — see the `tests/util`
/// `RecordingContext` for a minimal one.
///
/// `subscribe_wakeup` is how the context asks to be woken proactively: it
/// hands the loop a closure to call whenever *it* publishes something the
/// loop should notice before the next scheduled timeout.
pub trait Context: Send + Sync {
    fn subscribe_dispatch_sources(
        &self,
        add: DispatchSourceAddFn,
        remove: DispatchSourceRemoveFn,
    ) -> SubscriptionToken;
    fn unsubscribe_dispatch_sources(&self, token: SubscriptionToken);

    fn subscribe_watches(&self, add: WatchAddFn, remove: WatchRemoveFn) -> SubscriptionToken;
    fn unsubscribe_watches(&self, token: SubscriptionToken);

    fn subscribe_timeouts(&self, add: TimeoutAddFn, remove: TimeoutRemoveFn) -> SubscriptionToken;
    fn unsubscribe_timeouts(&self, token: SubscriptionToken);

    fn subscribe_wakeup(&self, wakeup: WakeupFn) -> SubscriptionToken;
    fn unsubscribe_wakeup(&self, token: SubscriptionToken);
}
