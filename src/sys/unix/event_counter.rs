use std::fs::File;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use crate::wake::WakeChannel;

/// Wake channel backed by `eventfd`.
///
/// `eventfd` is a 64 bit counter: writes add to it, a read drains it back
/// to zero and returns the accumulated count. Using it as a wake channel
/// means concurrent `wake()` calls from several threads collapse into a
/// single readable fd rather than queuing up, which is exactly the
/// idempotence spec section 4.A asks for.
#[derive(Debug)]
pub(crate) struct Waker {
    fd: File,
}

impl Waker {
    pub(crate) fn new() -> io::Result<Waker> {
        let fd = syscall!(eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK))?;
        Ok(Waker {
            fd: unsafe { File::from_raw_fd(fd) },
        })
    }

    fn reset(&self) -> io::Result<()> {
        let mut buf = [0u8; 8];
        match (&self.fd).read(&mut buf) {
            Ok(_) => Ok(()),
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl WakeChannel for Waker {
    fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    fn wake(&self) -> io::Result<()> {
        let buf: [u8; 8] = 1u64.to_ne_bytes();
        match (&self.fd).write(&buf) {
            Ok(_) => Ok(()),
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                // The counter is about to overflow; draining it and retrying
                // still leaves the fd readable, which is all a waiter needs.
                self.reset()?;
                self.wake()
            }
            Err(err) => Err(err),
        }
    }

    fn ack(&self) -> io::Result<()> {
        self.reset()
    }
}
