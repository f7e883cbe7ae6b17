//! Registry of parties interested in new notices.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

use crate::models::Notice;

/// Receiver of new-notice deltas.
///
/// Invoked synchronously from the poll that found the notices; long-running
/// work (network delivery) should be handed off to a task.
pub trait NoticeObserver: Send + Sync {
    fn on_new_notices(&self, notices: &[Notice]);
}

impl<F> NoticeObserver for F
where
    F: Fn(&[Notice]) + Send + Sync,
{
    fn on_new_notices(&self, notices: &[Notice]) {
        self(notices)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Arc<dyn NoticeObserver>)>,
}

/// Set of registered observers.
///
/// Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer.
    ///
    /// Registering the same `Arc` twice keeps a single entry; both returned
    /// subscriptions refer to it.
    pub fn subscribe(&self, observer: Arc<dyn NoticeObserver>) -> Subscription {
        let mut registry = self.lock();

        let existing = registry
            .entries
            .iter()
            .find(|(_, o)| same_observer(o, &observer))
            .map(|(id, _)| *id);

        let id = match existing {
            Some(id) => id,
            None => {
                registry.next_id += 1;
                let id = registry.next_id;
                registry.entries.push((id, observer));
                id
            }
        };

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Register a closure.
    pub fn subscribe_fn<F>(&self, f: F) -> Subscription
    where
        F: Fn(&[Notice]) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(f))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand `notices` to every registered observer.
    ///
    /// Observers are snapshotted first, so they may subscribe or unsubscribe
    /// while being notified; such changes apply from the next call. A
    /// panicking observer is logged and skipped. Returns the number of
    /// observers invoked.
    pub fn notify(&self, notices: &[Notice]) -> usize {
        let observers: Vec<Arc<dyn NoticeObserver>> = self
            .lock()
            .entries
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();

        for observer in &observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_new_notices(notices))).is_err() {
                log::error!("Notice observer panicked; continuing with the rest");
            }
        }
        observers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn same_observer(a: &Arc<dyn NoticeObserver>, b: &Arc<dyn NoticeObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Handle that removes one registration.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Remove the observer; a no-op if it is already gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}
