use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::context::{Context, SubscriptionToken};
use crate::dispatch_source::Readiness;
use crate::error::EventLoopError;
use crate::fd_table::FdTable;
use crate::poll_events::PollEvents;
use crate::priority::Priority;
use crate::registry::{Lifecycle, Registry, SourceSlot, TimeoutSlot, WatchSlot};
use crate::time::monotonic_ms;
use crate::wake::WakeChannel;
use crate::{DispatchSource, Timeout, Watch};

/// Entries a Prepare/Check pass has marked ready, waiting for Dispatch.
///
/// Lives as long as the loop rather than as a per-iteration local so Sweep
/// (at the *start* of the next iteration) can still see what a previous
/// pass marked pending, per spec section 3's deletion invariant: a
/// registry entry is only reaped once it is no longer referenced here.
#[derive(Default)]
struct PendingSets {
    dispatch_sources: Vec<Arc<SourceSlot>>,
    watches: Vec<(Arc<WatchSlot>, PollEvents)>,
    timeouts: Vec<Arc<TimeoutSlot>>,
}

impl PendingSets {
    fn has_source(&self, slot: &Arc<SourceSlot>) -> bool {
        self.dispatch_sources.iter().any(|p| Arc::ptr_eq(p, slot))
    }

    fn has_watch(&self, slot: &Arc<WatchSlot>) -> bool {
        self.watches.iter().any(|(p, _)| Arc::ptr_eq(p, slot))
    }
}

struct Tokens {
    dispatch_sources: SubscriptionToken,
    watches: SubscriptionToken,
    timeouts: SubscriptionToken,
    wakeup: SubscriptionToken,
}

/// Best-effort description of a `catch_unwind` payload for logging.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Tighten a candidate poll timeout (ms) against the current minimum.
/// A negative value means "no bound"; the smallest non-negative value
/// wins.
fn tighten(current: i64, candidate: i64) -> i64 {
    if candidate < 0 {
        current
    } else if current < 0 || candidate < current {
        candidate
    } else {
        current
    }
}

/// A priority-ordered, single-threaded reactor multiplexing watches,
/// timeouts, and self-dispatching sources over one `poll(2)` call.
///
/// Construct with [`EventLoop::new`], binding it to a [`Context`] that
/// supplies watches/timeouts/dispatch sources as they come and go. Drive
/// it with [`EventLoop::run`], or step it one iteration at a time with
/// [`EventLoop::do_single_iteration`] for embedding into another loop.
pub struct EventLoop<C: Context> {
    context: Arc<C>,
    wake: Arc<dyn WakeChannel>,
    fd_table: FdTable,
    dispatch_sources: Mutex<Registry<SourceSlot>>,
    watches: Mutex<Registry<WatchSlot>>,
    timeouts: Mutex<Registry<TimeoutSlot>>,
    pending: Mutex<PendingSets>,
    stop_requested: AtomicBool,
    /// Set whenever a dispatch source is unregistered; checked between
    /// dispatch-source callbacks so a source that unregisters another
    /// source mid-dispatch doesn't run stale entries (mirrors the
    /// original `isBroken_` latch).
    is_broken: AtomicBool,
    tokens: Tokens,
}

impl<C: Context + 'static> EventLoop<C> {
    /// Build a new loop bound to `context` and subscribe to its four
    /// registration channels.
    pub fn new(context: Arc<C>) -> Result<Arc<EventLoop<C>>, EventLoopError> {
        let wake_channel = match crate::wake::new_wake_channel() {
            Ok(wake_channel) => wake_channel,
            Err(err) => {
                log::error!("failed to initialize event loop: {err}");
                return Err(err);
            }
        };
        let wake: Arc<dyn WakeChannel> = Arc::from(wake_channel);
        let fd_table = FdTable::new(wake.clone());

        let loop_ = Arc::new_cyclic(|weak: &Weak<EventLoop<C>>| {
            let wakeup_token = {
                let weak = weak.clone();
                context.subscribe_wakeup(Box::new(move || {
                    if let Some(this) = weak.upgrade() {
                        if let Err(err) = this.wake.wake() {
                            log::warn!("{}", EventLoopError::WriteWake(err));
                        }
                    }
                }))
            };

            let dispatch_sources_token = {
                let weak_add = weak.clone();
                let weak_remove = weak.clone();
                context.subscribe_dispatch_sources(
                    Box::new(move |source, priority| {
                        if let Some(this) = weak_add.upgrade() {
                            this.register_dispatch_source(source, priority);
                        }
                    }),
                    Box::new(move |source| {
                        if let Some(this) = weak_remove.upgrade() {
                            this.unregister_dispatch_source(&source);
                        }
                    }),
                )
            };

            let watches_token = {
                let weak_add = weak.clone();
                let weak_remove = weak.clone();
                context.subscribe_watches(
                    Box::new(move |watch, priority| {
                        if let Some(this) = weak_add.upgrade() {
                            this.register_watch(watch, priority);
                        }
                    }),
                    Box::new(move |watch| {
                        if let Some(this) = weak_remove.upgrade() {
                            this.unregister_watch(&watch);
                        }
                    }),
                )
            };

            let timeouts_token = {
                let weak_add = weak.clone();
                let weak_remove = weak.clone();
                context.subscribe_timeouts(
                    Box::new(move |timeout, priority| {
                        if let Some(this) = weak_add.upgrade() {
                            this.register_timeout(timeout, priority);
                        }
                    }),
                    Box::new(move |timeout| {
                        if let Some(this) = weak_remove.upgrade() {
                            this.unregister_timeout(&timeout);
                        }
                    }),
                )
            };

            EventLoop {
                context: context.clone(),
                wake,
                fd_table,
                dispatch_sources: Mutex::new(Registry::new()),
                watches: Mutex::new(Registry::new()),
                timeouts: Mutex::new(Registry::new()),
                pending: Mutex::new(PendingSets::default()),
                stop_requested: AtomicBool::new(false),
                is_broken: AtomicBool::new(false),
                tokens: Tokens {
                    dispatch_sources: dispatch_sources_token,
                    watches: watches_token,
                    timeouts: timeouts_token,
                    wakeup: wakeup_token,
                },
            }
        });

        Ok(loop_)
    }

    /// Run until [`stop`](EventLoop::stop) is called, blocking the calling
    /// thread. `min_timeout_ms` bounds how long a single `poll(2)` call may
    /// block when nothing else needs a tighter deadline; negative means no
    /// bound.
    pub fn run(&self, min_timeout_ms: i64) {
        while !self.stop_requested.load(Ordering::Acquire) {
            self.do_single_iteration(min_timeout_ms);
        }
    }

    /// Ask [`run`](EventLoop::run) to return after the current iteration.
    /// Safe to call from any thread, including from inside a dispatch.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        if let Err(err) = self.wake.wake() {
            log::warn!("{}", EventLoopError::WriteWake(err));
        }
    }

    /// Wake a blocked `poll(2)` without stopping the loop.
    pub fn wakeup(&self) {
        if let Err(err) = self.wake.wake() {
            log::warn!("{}", EventLoopError::WriteWake(err));
        }
    }

    /// Run exactly one sweep/prepare/poll/check/dispatch cycle.
    ///
    /// Exposed for callers embedding this loop inside their own driver
    /// loop instead of calling [`run`](EventLoop::run).
    pub fn do_single_iteration(&self, min_timeout_ms: i64) {
        self.sweep_deletions();
        let (ready, timeout_ms) = self.prepare(min_timeout_ms);
        if ready {
            self.dispatch();
            return;
        }
        self.poll(timeout_ms);
        if self.check() {
            self.dispatch();
        }
    }

    // ---- registration bridge, invoked from the Context callbacks ----

    fn register_dispatch_source(&self, source: Arc<dyn DispatchSource>, priority: Priority) {
        let slot = Arc::new(SourceSlot {
            priority,
            lifecycle: Mutex::new(Lifecycle::default()),
            source,
        });
        self.dispatch_sources.lock().unwrap().insert(slot);
    }

    fn unregister_dispatch_source(&self, source: &Arc<dyn DispatchSource>) {
        let slot = self
            .dispatch_sources
            .lock()
            .unwrap()
            .find(|slot| Arc::ptr_eq(&slot.source, source));
        if let Some(slot) = slot {
            slot.lifecycle.lock().unwrap().delete_requested = true;
        }
        // A removed source may have been mid-iteration through the
        // dispatch-source loop; stop that loop from touching anything
        // past this point until the next Prepare rebuilds it.
        self.is_broken.store(true, Ordering::SeqCst);
    }

    fn register_watch(&self, watch: Arc<dyn Watch>, priority: Priority) {
        let (fd, events) = watch.fd();
        self.fd_table.register(fd, events);
        let slot = Arc::new(WatchSlot {
            priority,
            lifecycle: Mutex::new(Lifecycle::default()),
            source: watch,
            fd,
            events,
        });
        self.watches.lock().unwrap().insert(slot);
    }

    fn unregister_watch(&self, watch: &Arc<dyn Watch>) {
        let slot = self
            .watches
            .lock()
            .unwrap()
            .find(|slot| Arc::ptr_eq(&slot.source, watch));
        if let Some(slot) = slot {
            self.fd_table.unregister(slot.fd, slot.events);
            slot.lifecycle.lock().unwrap().delete_requested = true;
        }
    }

    fn register_timeout(&self, timeout: Arc<dyn Timeout>, priority: Priority) {
        let slot = Arc::new(TimeoutSlot {
            priority,
            lifecycle: Mutex::new(Lifecycle::default()),
            source: timeout,
            elapsed: AtomicBool::new(false),
        });
        self.timeouts.lock().unwrap().insert(slot);
    }

    fn unregister_timeout(&self, timeout: &Arc<dyn Timeout>) {
        let slot = self
            .timeouts
            .lock()
            .unwrap()
            .find(|slot| Arc::ptr_eq(&slot.source, timeout));
        if let Some(slot) = slot {
            slot.lifecycle.lock().unwrap().delete_requested = true;
        }
    }

    // ---- the five phases ----

    /// Reap entries flagged for deletion that aren't currently in a
    /// pending-dispatch set and aren't mid-dispatch on another thread.
    ///
    /// Acquires one registry's mutex at a time rather than holding two
    /// together, unlike the deletion sweep it's modeled on — none of this
    /// crate's invariants require the wider lock, and it shrinks the
    /// window during which unrelated registrations block.
    fn sweep_deletions(&self) {
        let pending = self.pending.lock().unwrap();

        self.dispatch_sources.lock().unwrap().retain(|slot| {
            let lifecycle = slot.lifecycle.lock().unwrap();
            !lifecycle.delete_requested || lifecycle.in_dispatch || pending.has_source(slot)
        });

        self.watches.lock().unwrap().retain(|slot| {
            let lifecycle = slot.lifecycle.lock().unwrap();
            !lifecycle.delete_requested || lifecycle.in_dispatch || pending.has_watch(slot)
        });

        self.timeouts.lock().unwrap().retain(|slot| {
            let lifecycle = slot.lifecycle.lock().unwrap();
            !lifecycle.delete_requested
                || lifecycle.in_dispatch
                || pending.timeouts.iter().any(|p| Arc::ptr_eq(p, slot))
        });
    }

    /// Phase 2: ask every dispatch source and timeout if it's already
    /// ready, tightening the poll timeout as we go. Returns whether
    /// anything is ready, and the timeout to hand to `poll(2)` if not.
    fn prepare(&self, min_timeout_ms: i64) -> (bool, i64) {
        let mut current_min = min_timeout_ms;

        {
            let snapshot = self.dispatch_sources.lock().unwrap().snapshot();
            for slot in snapshot {
                if slot.lifecycle.lock().unwrap().delete_requested {
                    continue;
                }
                match slot.source.prepare() {
                    Readiness::Ready => {
                        let mut pending = self.pending.lock().unwrap();
                        if !pending.has_source(&slot) {
                            pending.dispatch_sources.push(slot);
                        }
                    }
                    Readiness::NotReady {
                        next_timeout_ms: Some(t),
                    } if t > 0 => {
                        current_min = tighten(current_min, t);
                    }
                    Readiness::NotReady { .. } => {}
                }
            }
        }

        let now = monotonic_ms();
        {
            let snapshot = self.timeouts.lock().unwrap().snapshot();
            let mut pending = self.pending.lock().unwrap();
            for slot in snapshot {
                if slot.lifecycle.lock().unwrap().delete_requested {
                    continue;
                }
                if slot.elapsed.load(Ordering::Acquire) {
                    continue;
                }
                let interval = slot.source.ready_time_ms() - now;
                if interval <= 0 {
                    slot.elapsed.store(true, Ordering::Release);
                    pending.timeouts.push(slot);
                    current_min = 0;
                } else {
                    current_min = tighten(current_min, interval);
                }
            }
        }

        let pending = self.pending.lock().unwrap();
        let ready = !pending.dispatch_sources.is_empty() || !pending.timeouts.is_empty();
        (ready, current_min)
    }

    /// Phase 3: block in `poll(2)` for up to `timeout_ms`, merge `revents`
    /// back into the FD table, and acknowledge the wake channel if it
    /// fired.
    fn poll(&self, timeout_ms: i64) {
        let mut scratch = self.fd_table.snapshot_for_poll();
        let timeout = if timeout_ms < 0 {
            -1
        } else {
            timeout_ms.min(i64::from(i32::MAX)) as i32
        };

        let n = loop {
            match poll_raw(&mut scratch, timeout) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn!("{}", EventLoopError::Poll(err));
                    break 0;
                }
            }
        };

        self.fd_table.merge_revents(&scratch);

        if n == 0 {
            // Nothing became ready; re-check timeouts in case the
            // requested bound was itself the deadline for one of them.
            let now = monotonic_ms();
            let snapshot = self.timeouts.lock().unwrap().snapshot();
            let mut pending = self.pending.lock().unwrap();
            for slot in snapshot {
                if slot.lifecycle.lock().unwrap().delete_requested {
                    continue;
                }
                if slot.elapsed.load(Ordering::Acquire) {
                    continue;
                }
                if slot.source.ready_time_ms() - now <= 0 {
                    slot.elapsed.store(true, Ordering::Release);
                    pending.timeouts.push(slot);
                }
            }
        }

        if self.fd_table.wake_fd_ready() {
            if let Err(err) = self.wake.ack() {
                log::warn!("{}", EventLoopError::ReadWake(err));
            }
        }
    }

    /// Phase 4: match ready descriptors against registered watches, and
    /// give dispatch sources Prepare skipped one more chance via `check`.
    fn check(&self) -> bool {
        let ready_fds = self.fd_table.ready_entries();
        if !ready_fds.is_empty() {
            let snapshot = self.watches.lock().unwrap().snapshot();
            for slot in snapshot {
                if slot.lifecycle.lock().unwrap().delete_requested {
                    continue;
                }
                if let Some(entry) = ready_fds.iter().find(|e| e.fd == slot.fd) {
                    let mut pending = self.pending.lock().unwrap();
                    if !pending.has_watch(&slot) {
                        pending.watches.push((slot, entry.revents.unwrap()));
                    }
                }
            }
        }

        {
            let snapshot = self.dispatch_sources.lock().unwrap().snapshot();
            for slot in snapshot {
                if slot.lifecycle.lock().unwrap().delete_requested {
                    continue;
                }
                if slot.source.check() {
                    let mut pending = self.pending.lock().unwrap();
                    if !pending.has_source(&slot) {
                        pending.dispatch_sources.push(slot);
                    }
                }
            }
        }

        let pending = self.pending.lock().unwrap();
        !pending.timeouts.is_empty() || !pending.watches.is_empty() || !pending.dispatch_sources.is_empty()
    }

    /// Phase 5: run every pending callback, timeouts first, then watches,
    /// then dispatch sources (each drained until it reports no more work).
    fn dispatch(&self) {
        let timeouts = std::mem::take(&mut self.pending.lock().unwrap().timeouts);
        for slot in timeouts {
            let mut lifecycle = slot.lifecycle.lock().unwrap();
            if lifecycle.delete_requested {
                continue;
            }
            lifecycle.in_dispatch = true;
            drop(lifecycle);

            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| slot.source.dispatch())) {
                log::error!("timeout dispatch panicked: {}", panic_message(&*payload));
            }

            slot.lifecycle.lock().unwrap().in_dispatch = false;
        }

        let watches = std::mem::take(&mut self.pending.lock().unwrap().watches);
        for (slot, revents) in watches {
            let mut lifecycle = slot.lifecycle.lock().unwrap();
            if lifecycle.delete_requested {
                continue;
            }
            lifecycle.in_dispatch = true;
            drop(lifecycle);

            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| slot.source.dispatch(revents))) {
                log::error!("watch dispatch panicked: {}", panic_message(&*payload));
            }

            slot.lifecycle.lock().unwrap().in_dispatch = false;
        }

        self.is_broken.store(false, Ordering::SeqCst);
        let sources = std::mem::take(&mut self.pending.lock().unwrap().dispatch_sources);
        for slot in sources {
            if self.is_broken.load(Ordering::SeqCst) {
                break;
            }
            let mut lifecycle = slot.lifecycle.lock().unwrap();
            if lifecycle.delete_requested {
                continue;
            }
            lifecycle.in_dispatch = true;
            drop(lifecycle);

            loop {
                if slot.lifecycle.lock().unwrap().delete_requested {
                    break;
                }
                match catch_unwind(AssertUnwindSafe(|| slot.source.dispatch())) {
                    Ok(more) => {
                        if !more {
                            break;
                        }
                    }
                    Err(payload) => {
                        log::error!("dispatch source panicked: {}", panic_message(&*payload));
                        break;
                    }
                }
            }

            slot.lifecycle.lock().unwrap().in_dispatch = false;
        }
    }
}

fn poll_raw(fds: &mut [libc::pollfd], timeout_ms: i32) -> io::Result<usize> {
    let n = syscall!(poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms))?;
    Ok(n as usize)
}

impl<C: Context> Drop for EventLoop<C> {
    /// Unsubscribe from the context, then free every remaining registry
    /// entry unconditionally — deletion flags and `in_dispatch` no longer
    /// matter once the loop itself is going away (spec section 3's
    /// teardown path).
    fn drop(&mut self) {
        self.context.unsubscribe_dispatch_sources(self.tokens.dispatch_sources);
        self.context.unsubscribe_watches(self.tokens.watches);
        self.context.unsubscribe_timeouts(self.tokens.timeouts);
        self.context.unsubscribe_wakeup(self.tokens.wakeup);

        self.dispatch_sources.lock().unwrap().clear();
        self.watches.lock().unwrap().clear();
        self.timeouts.lock().unwrap().clear();
    }
}
