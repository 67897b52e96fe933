// Token-keyed listener registry with per-listener panic isolation

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::events::UpdateEvent;

/// Callback invoked for every broadcast event
pub type Listener = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

/// Stable token identifying one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    // ids are handed out in increasing order, so key order is registration order
    entries: BTreeMap<ListenerId, Listener>,
}

/// Insertion-ordered set of listeners, cheap to clone (shared registry)
#[derive(Clone, Default)]
pub struct Listeners {
    registry: Arc<Mutex<Registry>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` and return its token
    pub fn add(&self, listener: Listener) -> ListenerId {
        let mut registry = self.registry.lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.insert(id, listener);
        id
    }

    /// Remove a registration. Returns false if the token was unknown.
    pub fn remove(&self, id: ListenerId) -> bool {
        self.registry.lock().entries.remove(&id).is_some()
    }

    /// Register `listener` and tie its lifetime to the returned guard
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.add(listener);
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener registered right now, in registration
    /// order. A panicking listener is logged and skipped. Returns how many
    /// listeners completed normally.
    pub fn notify(&self, event: &UpdateEvent) -> usize {
        // Snapshot so listeners may (un)subscribe from inside their callback
        let snapshot: Vec<(ListenerId, Listener)> = self
            .registry
            .lock()
            .entries
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect();

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".into());
                    log::error!(
                        "Update listener {:?} panicked on {}: {}",
                        id,
                        event.kind(),
                        reason
                    );
                }
            }
        }
        delivered
    }
}

/// Keeps a listener registered until dropped
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Unsubscribe now (same as dropping)
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().entries.remove(&self.id);
        }
    }
}
