use std::io;

use crate::wake::WakeChannel;

#[cfg(target_os = "linux")]
mod event_counter;
#[cfg(not(target_os = "linux"))]
mod socket_pair;

/// Build the wake channel for this platform.
///
/// Linux gets the `eventfd` counter (cheap, no socket backlog, no extra
/// fd on top of the one it wakes). Everywhere else falls back to a
/// loopback TCP pair — a plain pipe isn't always poll-able alongside
/// sockets on every target libc this crate may run on, and a TCP pair is
/// the one primitive guaranteed to be.
pub(crate) fn new_wake_channel() -> io::Result<Box<dyn WakeChannel>> {
    #[cfg(target_os = "linux")]
    {
        self::event_counter::Waker::new().map(|w| Box::new(w) as Box<dyn WakeChannel>)
    }
    #[cfg(not(target_os = "linux"))]
    {
        self::socket_pair::Waker::new().map(|w| Box::new(w) as Box<dyn WakeChannel>)
    }
}
