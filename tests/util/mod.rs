#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};

use priority_event_loop::{
    Context, DispatchSource, DispatchSourceAddFn, DispatchSourceRemoveFn, Priority,
    SubscriptionToken, Timeout, TimeoutAddFn, TimeoutRemoveFn, Watch, WakeupFn, WatchAddFn,
    WatchRemoveFn,
};

pub fn init() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        env_logger::try_init().expect("unable to initialise logger");
    })
}

/// A minimal [`Context`] for tests: each `subscribe_*` just stashes the
/// add/remove closures an `EventLoop` hands it, so `add_watch` /
/// `add_timeout` / `add_dispatch_source` can call straight into the loop
/// and `fire_wakeup` can trigger whatever notification it subscribed for.
#[derive(Default)]
pub struct RecordingContext {
    next_token: AtomicU64,
    dispatch_sources: Mutex<Option<(DispatchSourceAddFn, DispatchSourceRemoveFn)>>,
    watches: Mutex<Option<(WatchAddFn, WatchRemoveFn)>>,
    timeouts: Mutex<Option<(TimeoutAddFn, TimeoutRemoveFn)>>,
    wakeup: Mutex<Option<WakeupFn>>,
}

impl RecordingContext {
    pub fn new() -> Arc<RecordingContext> {
        Arc::new(RecordingContext::default())
    }

    fn next_token(&self) -> SubscriptionToken {
        SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_watch(&self, watch: Arc<dyn Watch>, priority: Priority) {
        let guard = self.watches.lock().unwrap();
        let (add, _) = guard.as_ref().expect("loop not attached yet");
        add(watch, priority);
    }

    pub fn remove_watch(&self, watch: Arc<dyn Watch>) {
        let guard = self.watches.lock().unwrap();
        let (_, remove) = guard.as_ref().expect("loop not attached yet");
        remove(watch);
    }

    pub fn add_timeout(&self, timeout: Arc<dyn Timeout>, priority: Priority) {
        let guard = self.timeouts.lock().unwrap();
        let (add, _) = guard.as_ref().expect("loop not attached yet");
        add(timeout, priority);
    }

    pub fn add_dispatch_source(&self, source: Arc<dyn DispatchSource>, priority: Priority) {
        let guard = self.dispatch_sources.lock().unwrap();
        let (add, _) = guard.as_ref().expect("loop not attached yet");
        add(source, priority);
    }

    pub fn remove_dispatch_source(&self, source: Arc<dyn DispatchSource>) {
        let guard = self.dispatch_sources.lock().unwrap();
        let (_, remove) = guard.as_ref().expect("loop not attached yet");
        remove(source);
    }

    pub fn fire_wakeup(&self) {
        if let Some(wakeup) = self.wakeup.lock().unwrap().as_ref() {
            wakeup();
        }
    }
}

impl Context for RecordingContext {
    fn subscribe_dispatch_sources(
        &self,
        add: DispatchSourceAddFn,
        remove: DispatchSourceRemoveFn,
    ) -> SubscriptionToken {
        *self.dispatch_sources.lock().unwrap() = Some((add, remove));
        self.next_token()
    }

    fn unsubscribe_dispatch_sources(&self, _token: SubscriptionToken) {
        *self.dispatch_sources.lock().unwrap() = None;
    }

    fn subscribe_watches(&self, add: WatchAddFn, remove: WatchRemoveFn) -> SubscriptionToken {
        *self.watches.lock().unwrap() = Some((add, remove));
        self.next_token()
    }

    fn unsubscribe_watches(&self, _token: SubscriptionToken) {
        *self.watches.lock().unwrap() = None;
    }

    fn subscribe_timeouts(&self, add: TimeoutAddFn, remove: TimeoutRemoveFn) -> SubscriptionToken {
        *self.timeouts.lock().unwrap() = Some((add, remove));
        self.next_token()
    }

    fn unsubscribe_timeouts(&self, _token: SubscriptionToken) {
        *self.timeouts.lock().unwrap() = None;
    }

    fn subscribe_wakeup(&self, wakeup: WakeupFn) -> SubscriptionToken {
        *self.wakeup.lock().unwrap() = Some(wakeup);
        self.next_token()
    }

    fn unsubscribe_wakeup(&self, _token: SubscriptionToken) {
        *self.wakeup.lock().unwrap() = None;
    }
}
