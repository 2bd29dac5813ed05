mod util;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use priority_event_loop::{DispatchSource, EventLoop, Priority, Readiness};

use util::RecordingContext;

/// A dispatch source with a small fixed backlog: `prepare` reports `Ready`
/// while anything remains, and each `dispatch` call drains one unit,
/// returning whether more is left.
struct QueueSource {
    remaining: AtomicUsize,
    drained: AtomicUsize,
}

impl DispatchSource for QueueSource {
    fn prepare(&self) -> Readiness {
        if self.remaining.load(Ordering::SeqCst) > 0 {
            Readiness::Ready
        } else {
            Readiness::NotReady {
                next_timeout_ms: None,
            }
        }
    }

    fn check(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) > 0
    }

    fn dispatch(&self) -> bool {
        let remaining = self.remaining.fetch_sub(1, Ordering::SeqCst) - 1;
        self.drained.fetch_add(1, Ordering::SeqCst);
        remaining > 0
    }
}

#[test]
fn dispatch_source_drains_its_whole_backlog_in_one_iteration() {
    util::init();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let source = Arc::new(QueueSource {
        remaining: AtomicUsize::new(3),
        drained: AtomicUsize::new(0),
    });
    context.add_dispatch_source(source.clone(), Priority::DEFAULT);

    event_loop.do_single_iteration(0);

    assert_eq!(source.drained.load(Ordering::SeqCst), 3);
    assert_eq!(source.remaining.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_dispatch_source_does_not_dispatch() {
    util::init();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let source = Arc::new(QueueSource {
        remaining: AtomicUsize::new(0),
        drained: AtomicUsize::new(0),
    });
    context.add_dispatch_source(source.clone(), Priority::DEFAULT);

    event_loop.do_single_iteration(0);

    assert_eq!(source.drained.load(Ordering::SeqCst), 0);
}
