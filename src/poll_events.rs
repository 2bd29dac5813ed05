use std::num::NonZeroU16;
use std::{fmt, ops};

/// The event mask a [`Watch`] registers interest in, and the `revents` mask
/// the loop later reports back to its `dispatch`.
///
/// Modeled directly on `libc::pollfd`'s `events`/`revents` fields: a bitset
/// over the handful of `POLL*` bits this crate cares about. Kept as a
/// hand-rolled bitset rather than a `bitflags` dependency, matching how
/// [`crate::Priority`]'s sibling types in the wider `mio` family (e.g.
/// `Interest`) avoid pulling in a crate for a handful of bits.
///
/// [`Watch`]: crate::Watch
///
/// ```
/// use priority_event_loop::PollEvents;
///
/// let interest = PollEvents::READABLE | PollEvents::WRITABLE;
/// assert!(interest.is_readable());
/// assert!(interest.is_writable());
/// ```
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct PollEvents(NonZeroU16);

const READABLE: u16 = 0b0_0001;
const WRITABLE: u16 = 0b0_0010;
const ERROR: u16 = 0b0_0100;
const HUP: u16 = 0b0_1000;
const PRIORITY: u16 = 0b1_0000;

impl PollEvents {
    /// Readiness for reading.
    pub const READABLE: PollEvents = PollEvents(unsafe { NonZeroU16::new_unchecked(READABLE) });
    /// Readiness for writing.
    pub const WRITABLE: PollEvents = PollEvents(unsafe { NonZeroU16::new_unchecked(WRITABLE) });
    /// The descriptor entered an error state.
    pub const ERROR: PollEvents = PollEvents(unsafe { NonZeroU16::new_unchecked(ERROR) });
    /// The remote end hung up.
    pub const HUP: PollEvents = PollEvents(unsafe { NonZeroU16::new_unchecked(HUP) });
    /// Urgent/out-of-band readiness.
    pub const PRIORITY: PollEvents = PollEvents(unsafe { NonZeroU16::new_unchecked(PRIORITY) });

    /// Combine two event masks.
    ///
    /// Same as the `BitOr` implementation, exposed as a `const fn` for use in
    /// constant contexts.
    pub const fn add(self, other: PollEvents) -> PollEvents {
        PollEvents(unsafe { NonZeroU16::new_unchecked(self.0.get() | other.0.get()) })
    }

    pub const fn is_readable(self) -> bool {
        (self.0.get() & READABLE) != 0
    }

    pub const fn is_writable(self) -> bool {
        (self.0.get() & WRITABLE) != 0
    }

    pub const fn is_error(self) -> bool {
        (self.0.get() & ERROR) != 0
    }

    pub const fn is_hup(self) -> bool {
        (self.0.get() & HUP) != 0
    }

    pub const fn is_priority(self) -> bool {
        (self.0.get() & PRIORITY) != 0
    }

    /// Translate to the `libc::pollfd.events`/`revents` bits this mask
    /// represents.
    pub(crate) fn to_poll_bits(self) -> libc::c_short {
        let mut bits = 0;
        if self.is_readable() {
            bits |= libc::POLLIN;
        }
        if self.is_writable() {
            bits |= libc::POLLOUT;
        }
        bits
    }

    /// Build a mask from the `revents` bits a `poll(2)` call reported.
    pub(crate) fn from_poll_bits(bits: libc::c_short) -> Option<PollEvents> {
        let mut value: u16 = 0;
        if bits & (libc::POLLIN | libc::POLLPRI) != 0 {
            value |= READABLE;
        }
        if bits & libc::POLLOUT != 0 {
            value |= WRITABLE;
        }
        if bits & libc::POLLERR != 0 {
            value |= ERROR;
        }
        if bits & libc::POLLHUP != 0 {
            value |= HUP;
        }
        if bits & libc::POLLPRI != 0 {
            value |= PRIORITY;
        }
        NonZeroU16::new(value).map(PollEvents)
    }
}

impl ops::BitOr for PollEvents {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        self.add(other)
    }
}

impl ops::BitOrAssign for PollEvents {
    fn bitor_assign(&mut self, other: Self) {
        *self = *self | other;
    }
}

impl fmt::Debug for PollEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        macro_rules! flag {
            ($name:expr, $test:expr) => {
                if $test {
                    if !first {
                        write!(f, " | ")?;
                    }
                    write!(f, $name)?;
                    first = false;
                }
            };
        }
        flag!("READABLE", self.is_readable());
        flag!("WRITABLE", self.is_writable());
        flag!("ERROR", self.is_error());
        flag!("HUP", self.is_hup());
        flag!("PRIORITY", self.is_priority());
        Ok(())
    }
}
