/// Outcome of a [`DispatchSource::prepare`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The source already has work; skip polling entirely this iteration.
    Ready,
    /// Not ready yet. If the source can bound how long it'll stay that way,
    /// it reports the bound here so Prepare can tighten the poll timeout;
    /// `None` means "no opinion".
    NotReady { next_timeout_ms: Option<i64> },
}

/// A source that reports its own readiness rather than being backed by a
/// single file descriptor — an in-memory queue, a batching layer, anything
/// that doesn't map onto one `poll(2)` entry.
///
/// Invoked every iteration in Prepare and (if still not ready) in Check;
/// see spec section 3 for the exact state machine this implements against.
pub trait DispatchSource: Send + Sync {
    /// Called during Prepare, before polling. Cheap early-out for sources
    /// that already know they're ready.
    fn prepare(&self) -> Readiness;

    /// Called during Check, after polling, for sources Prepare didn't mark
    /// ready. Returns whether the source is ready now.
    fn check(&self) -> bool;

    /// Run one unit of work. Returns `true` if there is more queued up
    /// immediately, in which case the loop calls this again before moving
    /// on to the next source; returns `false` once drained.
    fn dispatch(&self) -> bool;
}
