mod util;

use std::sync::{Arc, Mutex};

use priority_event_loop::{monotonic_ms, EventLoop, Priority, Timeout};

use util::RecordingContext;

struct OrderRecordingTimeout {
    id: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
}

impl Timeout for OrderRecordingTimeout {
    fn ready_time_ms(&self) -> i64 {
        // All three are already due; ordering must come entirely from
        // priority, not from deadline.
        monotonic_ms() - 1
    }

    fn dispatch(&self) {
        self.order.lock().unwrap().push(self.id);
    }
}

#[test]
fn higher_priority_dispatches_before_lower_and_ties_keep_registration_order() {
    util::init();

    let context = RecordingContext::new();
    let event_loop = EventLoop::new(context.clone()).expect("wake channel init");

    let order = Arc::new(Mutex::new(Vec::new()));

    let low = Arc::new(OrderRecordingTimeout {
        id: "low",
        order: order.clone(),
    });
    let high = Arc::new(OrderRecordingTimeout {
        id: "high",
        order: order.clone(),
    });
    let high_second = Arc::new(OrderRecordingTimeout {
        id: "high-second",
        order: order.clone(),
    });

    // Register out of priority order: low-priority first, then two
    // high-priority entries, to prove sorting isn't an artifact of
    // registration order alone.
    context.add_timeout(low, Priority(10));
    context.add_timeout(high, Priority(-5));
    context.add_timeout(high_second, Priority(-5));

    event_loop.do_single_iteration(-1);

    assert_eq!(*order.lock().unwrap(), vec!["high", "high-second", "low"]);
}
