use std::os::unix::io::RawFd;

use crate::poll_events::PollEvents;

/// A registration binding one file descriptor and event mask to a callback.
///
/// The loop calls [`fd`](Watch::fd) once, at registration, to learn what to
/// poll for; it never calls it again for the lifetime of the registration,
/// so a `Watch` must not change which descriptor it represents.
pub trait Watch: Send + Sync {
    /// The descriptor and the events to watch it for.
    fn fd(&self) -> (RawFd, PollEvents);

    /// Invoked with the `revents` `poll(2)` actually reported.
    ///
    /// Called with the entry's `in_dispatch` flag already set; the loop
    /// clears it again once this returns, including if it panics.
    fn dispatch(&self, revents: PollEvents);
}
