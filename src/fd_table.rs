use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex};

use crate::poll_events::PollEvents;
use crate::wake::WakeChannel;

/// One row of the FD table: a descriptor, the events it's interested in,
/// and the `revents` the last `poll(2)` call reported for it.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FdTableEntry {
    pub fd: RawFd,
    pub events: PollEvents,
    pub revents: Option<PollEvents>,
}

/// The ordered sequence of descriptors handed to `poll(2)` each iteration.
///
/// Index 0 is always the wake channel's fd (spec section 4.B): it's
/// inserted once at construction and never removed. Every other entry
/// corresponds to a live [`crate::Watch`] registration.
///
/// A single mutex guards the whole table rather than per-entry locks,
/// matching the `poll`-selector's `Mutex<Fds>` design: the table is only
/// ever held locked across a cheap snapshot/merge, never across a
/// `poll(2)` call or a user callback.
pub(crate) struct FdTable {
    wake: Arc<dyn WakeChannel>,
    entries: Mutex<Vec<FdTableEntry>>,
}

impl FdTable {
    pub(crate) fn new(wake: Arc<dyn WakeChannel>) -> FdTable {
        let wake_fd = wake.raw_fd();
        FdTable {
            wake,
            entries: Mutex::new(vec![FdTableEntry {
                fd: wake_fd,
                events: PollEvents::READABLE,
                revents: None,
            }]),
        }
    }

    pub(crate) fn register(&self, fd: RawFd, events: PollEvents) {
        self.entries.lock().unwrap().push(FdTableEntry {
            fd,
            events,
            revents: None,
        });
    }

    /// Remove the entry matching `(fd, events)`, waking a concurrently
    /// blocked `poll(2)` first so it can't keep waiting on a descriptor
    /// that's about to be invalid (spec section 4.D).
    pub(crate) fn unregister(&self, fd: RawFd, events: PollEvents) {
        let _ = self.wake.wake();
        let mut entries = self.entries.lock().unwrap();
        if let Some(pos) = entries
            .iter()
            .position(|e| e.fd == fd && e.events == events)
        {
            entries.remove(pos);
        }
    }

    pub(crate) fn snapshot_for_poll(&self) -> Vec<libc::pollfd> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| libc::pollfd {
                fd: e.fd,
                events: e.events.to_poll_bits(),
                revents: 0,
            })
            .collect()
    }

    /// Copy `revents` back from a polled scratch buffer, matching entries
    /// by index and re-checking `(fd, events)` so a registration change
    /// that raced the `poll(2)` call is never misapplied to the wrong row.
    pub(crate) fn merge_revents(&self, scratch: &[libc::pollfd]) {
        let mut entries = self.entries.lock().unwrap();
        for (entry, polled) in entries.iter_mut().zip(scratch.iter()) {
            if entry.fd == polled.fd && entry.events.to_poll_bits() == polled.events {
                entry.revents = PollEvents::from_poll_bits(polled.revents);
            }
        }
    }

    /// True once the wake channel's entry (index 0) was reported ready.
    pub(crate) fn wake_fd_ready(&self) -> bool {
        self.entries
            .lock()
            .unwrap()
            .first()
            .is_some_and(|e| e.revents.is_some())
    }

    /// Snapshot of non-wake entries with a non-empty `revents`, for the
    /// Check phase.
    pub(crate) fn ready_entries(&self) -> Vec<FdTableEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .skip(1)
            .filter(|e| e.revents.is_some())
            .copied()
            .collect()
    }
}
