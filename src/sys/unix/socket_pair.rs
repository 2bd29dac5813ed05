use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};

use crate::wake::WakeChannel;

/// Wake channel backed by a connected loopback TCP pair.
///
/// Used on targets without `eventfd`. A single byte written to `sender` is
/// enough to make `receiver` readable; `ack` drains whatever has
/// accumulated since the last wake. Bound to `127.0.0.1:0` so no fixed
/// port can ever conflict between event loops in the same process.
#[derive(Debug)]
pub(crate) struct Waker {
    sender: TcpStream,
    receiver: TcpStream,
}

impl Waker {
    pub(crate) fn new() -> io::Result<Waker> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let sender = TcpStream::connect(addr)?;
        let (receiver, _) = listener.accept()?;

        sender.set_nodelay(true)?;
        receiver.set_nodelay(true)?;
        receiver.set_nonblocking(true)?;

        Ok(Waker { sender, receiver })
    }
}

impl WakeChannel for Waker {
    fn raw_fd(&self) -> RawFd {
        self.receiver.as_raw_fd()
    }

    fn wake(&self) -> io::Result<()> {
        match (&self.sender).write(&[1u8]) {
            Ok(_) => Ok(()),
            Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn ack(&self) -> io::Result<()> {
        let mut buf = [0u8; 64];
        loop {
            match (&self.receiver).read(&mut buf) {
                Ok(n) if n > 0 => continue,
                Ok(_) => return Ok(()),
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}
