mod util;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use priority_event_loop::{monotonic_ms, EventLoop, Priority, Timeout};

use util::RecordingContext;

struct CountingTimeout {
    deadline_ms: i64,
    fired: AtomicUsize,
}

impl Timeout for CountingTimeout {
    fn ready_time_ms(&self) -> i64 {
        self.deadline_ms
    }

    fn dispatch(&self) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn single_timer_fires_once() {
    util::init();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let timeout = Arc::new(CountingTimeout {
        deadline_ms: monotonic_ms() + 10,
        fired: AtomicUsize::new(0),
    });
    context.add_timeout(timeout.clone(), Priority::DEFAULT);

    // The deadline hasn't passed yet: one iteration should poll and find
    // nothing ready.
    event_loop.do_single_iteration(0);
    assert_eq!(timeout.fired.load(Ordering::SeqCst), 0);

    std::thread::sleep(std::time::Duration::from_millis(20));

    event_loop.do_single_iteration(-1);
    assert_eq!(timeout.fired.load(Ordering::SeqCst), 1);

    // A second iteration must not re-fire the same, already-elapsed timeout.
    event_loop.do_single_iteration(0);
    assert_eq!(timeout.fired.load(Ordering::SeqCst), 1);
}

#[test]
fn already_elapsed_timeout_fires_on_first_iteration() {
    util::init();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let timeout = Arc::new(CountingTimeout {
        deadline_ms: monotonic_ms() - 1,
        fired: AtomicUsize::new(0),
    });
    context.add_timeout(timeout.clone(), Priority::DEFAULT);

    event_loop.do_single_iteration(-1);
    assert_eq!(timeout.fired.load(Ordering::SeqCst), 1);
}
