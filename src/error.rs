use std::io;

/// Errors the loop can report back to its owner.
///
/// See spec section 7 ("Error Handling Design"): `UserCallback` errors are
/// deliberately absent here — an error escaping a watch/timeout/source
/// callback is the caller's own concern and never becomes a variant of this
/// enum; the loop only guarantees that `in_dispatch` is still cleared for the
/// entry afterwards.
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    /// Construction failed because the wake channel could not be created.
    ///
    /// Fatal: an [`EventLoop`](crate::EventLoop) cannot be built without one.
    #[error("failed to initialize wake channel: {0}")]
    WakeChannelInit(#[source] io::Error),

    /// The underlying `poll(2)` call returned an error.
    ///
    /// Constructed internally by [`EventLoop::poll`](crate::EventLoop) and
    /// logged there; treated as "no descriptors ready" and the loop
    /// continues. Never returned to a caller.
    #[error("poll(2) failed: {0}")]
    Poll(#[source] io::Error),

    /// Writing to the wake channel failed.
    ///
    /// Constructed internally wherever the loop calls
    /// [`WakeChannel::wake`](crate::wake::WakeChannel::wake) — `stop`,
    /// `wakeup`, and the wakeup subscription — and logged there.
    #[error("failed to write wake notification: {0}")]
    WriteWake(#[source] io::Error),

    /// Reading (acknowledging) the wake channel failed.
    ///
    /// Constructed internally by [`EventLoop::poll`](crate::EventLoop) after
    /// `poll(2)` reports the wake fd readable, and logged there.
    #[error("failed to acknowledge wake notification: {0}")]
    ReadWake(#[source] io::Error),
}
