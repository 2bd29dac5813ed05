mod util;

use std::io::Write;
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};

use priority_event_loop::{EventLoop, PollEvents, Priority, Watch};

use util::RecordingContext;

struct RecordedWatch {
    fd: RawFd,
    events: PollEvents,
    dispatched: Mutex<Vec<PollEvents>>,
}

impl Watch for RecordedWatch {
    fn fd(&self) -> (RawFd, PollEvents) {
        (self.fd, self.events)
    }

    fn dispatch(&self, revents: PollEvents) {
        self.dispatched.lock().unwrap().push(revents);
    }
}

#[test]
fn readable_fd_dispatches_watch() {
    util::init();

    let (mut writer, reader) = UnixStream::pair().expect("unix socket pair");
    reader.set_nonblocking(true).unwrap();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let watch = Arc::new(RecordedWatch {
        fd: reader.as_raw_fd(),
        events: PollEvents::READABLE,
        dispatched: Mutex::new(Vec::new()),
    });
    context.add_watch(watch.clone(), Priority::DEFAULT);

    // Nothing written yet: a zero-timeout iteration must not dispatch.
    event_loop.do_single_iteration(0);
    assert!(watch.dispatched.lock().unwrap().is_empty());

    writer.write_all(b"x").unwrap();

    event_loop.do_single_iteration(1_000);
    let dispatched = watch.dispatched.lock().unwrap();
    assert_eq!(dispatched.len(), 1);
    assert!(dispatched[0].is_readable());

    // `reader` must stay alive for the duration of the registration.
    drop(reader);
}

#[test]
fn unregistered_watch_stops_receiving_events() {
    util::init();

    let (mut writer, reader) = UnixStream::pair().expect("unix socket pair");
    reader.set_nonblocking(true).unwrap();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let watch = Arc::new(RecordedWatch {
        fd: reader.as_raw_fd(),
        events: PollEvents::READABLE,
        dispatched: Mutex::new(Vec::new()),
    });
    context.add_watch(watch.clone(), Priority::DEFAULT);
    context.remove_watch(watch.clone());

    writer.write_all(b"x").unwrap();
    event_loop.do_single_iteration(50);

    // The watch was unregistered before anything was ever written, so it
    // must not have been dispatched.
    assert!(watch.dispatched.lock().unwrap().is_empty());
}
