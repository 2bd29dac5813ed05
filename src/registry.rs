use std::collections::BTreeMap;
use std::os::unix::io::RawFd;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use crate::poll_events::PollEvents;
use crate::priority::Priority;
use crate::{DispatchSource, Timeout, Watch};

/// Lifecycle flags shared by every registry entry kind (spec section 3).
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    pub delete_requested: bool,
    pub in_dispatch: bool,
}

pub(crate) trait RegistryEntry {
    fn priority(&self) -> Priority;
}

pub(crate) struct WatchSlot {
    pub priority: Priority,
    pub lifecycle: Mutex<Lifecycle>,
    pub source: Arc<dyn Watch>,
    pub fd: RawFd,
    pub events: PollEvents,
}

impl RegistryEntry for WatchSlot {
    fn priority(&self) -> Priority {
        self.priority
    }
}

pub(crate) struct TimeoutSlot {
    pub priority: Priority,
    pub lifecycle: Mutex<Lifecycle>,
    pub source: Arc<dyn Timeout>,
    /// Set once a Prepare/Poll pass observes the deadline has passed.
    /// Never cleared by the loop; re-arming means registering anew.
    pub elapsed: AtomicBool,
}

impl RegistryEntry for TimeoutSlot {
    fn priority(&self) -> Priority {
        self.priority
    }
}

pub(crate) struct SourceSlot {
    pub priority: Priority,
    pub lifecycle: Mutex<Lifecycle>,
    pub source: Arc<dyn DispatchSource>,
}

impl RegistryEntry for SourceSlot {
    fn priority(&self) -> Priority {
        self.priority
    }
}

/// A priority-ordered multimap of registry entries.
///
/// `BTreeMap<Priority, _>` iterates ascending, i.e. highest-priority
/// (lowest-numbered) group first; the `Vec` within a group preserves
/// registration order. Together that's exactly "priority order, ties
/// broken by registration order" with no extra sort step and no separate
/// entry-id field — identity is just `Arc::ptr_eq` on the slot itself.
pub(crate) struct Registry<T> {
    groups: BTreeMap<Priority, Vec<Arc<T>>>,
}

impl<T: RegistryEntry> Registry<T> {
    pub(crate) fn new() -> Registry<T> {
        Registry {
            groups: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, entry: Arc<T>) {
        self.groups.entry(entry.priority()).or_default().push(entry);
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.groups.values().flatten()
    }

    pub(crate) fn find(&self, predicate: impl Fn(&Arc<T>) -> bool) -> Option<Arc<T>> {
        for entry in self.iter() {
            if predicate(entry) {
                return Some(entry.clone());
            }
        }
        None
    }

    /// Cheap `Arc` clones of every live entry, in dispatch order, so a
    /// phase can iterate without holding the registry mutex across a user
    /// callback.
    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.iter().cloned().collect()
    }

    /// Drop every entry for which `predicate` returns false, preserving
    /// order, and drop emptied priority groups.
    pub(crate) fn retain(&mut self, mut predicate: impl FnMut(&Arc<T>) -> bool) {
        self.groups.retain(|_, group| {
            group.retain(|e| predicate(e));
            !group.is_empty()
        });
    }

    pub(crate) fn clear(&mut self) {
        self.groups.clear();
    }
}
