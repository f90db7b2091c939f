// ── Callback subscriptions ──
//
// Copy-on-write subscriber lists shared by the event stream and the
// object controllers. Dispatch walks an immutable snapshot, so callbacks
// may subscribe or unsubscribe while a dispatch is running. A panicking
// callback is caught and logged; delivery to the rest continues.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use tracing::warn;

type Predicate<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;
type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    predicate: Predicate<T>,
    callback: Callback<T>,
}

/// An ordered list of `(predicate, callback)` pairs.
pub struct Subscribers<T> {
    name: &'static str,
    entries: ArcSwap<Vec<Arc<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T: 'static> Subscribers<T> {
    /// `name` labels panic logs.
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            entries: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a callback invoked for every item the predicate accepts.
    pub fn subscribe<P, F>(self: &Arc<Self>, predicate: P, callback: F) -> SubscriptionHandle
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry {
            id,
            predicate: Box::new(predicate),
            callback: Box::new(callback),
        });
        self.entries.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&entry));
            next
        });

        let owner: Weak<dyn Unsubscribe> = Arc::downgrade(self) as Weak<dyn Unsubscribe>;
        SubscriptionHandle { id, owner }
    }

    /// Deliver `item` to every matching subscriber in registration order.
    /// Returns how many callbacks ran to completion.
    pub fn dispatch(&self, item: &T) -> usize {
        let snapshot = self.entries.load_full();
        let mut delivered = 0;
        for entry in snapshot.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                if (entry.predicate)(item) {
                    (entry.callback)(item);
                    true
                } else {
                    false
                }
            }));
            match outcome {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(_) => warn!(
                    subscribers = self.name,
                    subscription = entry.id,
                    "subscriber callback panicked"
                ),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64) -> bool;
}

impl<T: 'static> Unsubscribe for Subscribers<T> {
    fn remove(&self, id: u64) -> bool {
        let mut removed = false;
        self.entries.rcu(|current| {
            let next: Vec<_> = current.iter().filter(|e| e.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }
}

/// Returned by every `subscribe`; the subscription stays active until
/// [`unsubscribe`](Self::unsubscribe) is called.
#[must_use = "dropping the handle keeps the subscription active but makes it impossible to remove"]
pub struct SubscriptionHandle {
    id: u64,
    owner: Weak<dyn Unsubscribe>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.owner.upgrade().is_some_and(|owner| owner.remove(self.id))
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle").field("id", &self.id).finish()
    }
}
