use std::fmt;
use std::io;
use std::os::unix::io::RawFd;

use crate::error::EventLoopError;

/// Cross-thread "please return from the blocking poll" primitive (spec
/// section 4.A).
///
/// `wake()` must be callable from any thread, must never block, and must
/// never let an I/O error escape to the caller (section 7: `WriteWake`
/// errors are logged, not propagated). `ack()` drains whatever made the fd
/// readable so a subsequent `poll(2)` doesn't spin hot on it.
///
/// Two implementations exist, selected at construction the way
/// [`crate::sys::new_wake_channel`] picks between them: an OS event counter
/// where available (`eventfd` on Linux), and a loopback TCP pair everywhere
/// else — a real pollable descriptor is required since anonymous pipes
/// aren't always poll-able alongside sockets on every target.
pub(crate) trait WakeChannel: fmt::Debug + Send + Sync {
    /// The descriptor the FD table polls for readiness.
    fn raw_fd(&self) -> RawFd;

    /// Make the fd readable. Idempotent: waking twice before the next ack
    /// causes at most one extra wakeup, never two.
    fn wake(&self) -> io::Result<()>;

    /// Drain the fd back to a non-readable state.
    fn ack(&self) -> io::Result<()>;
}

pub(crate) fn new_wake_channel() -> Result<Box<dyn WakeChannel>, EventLoopError> {
    crate::sys::new_wake_channel().map_err(EventLoopError::WakeChannelInit)
}
