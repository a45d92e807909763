//! Notification center delivering change notifications to observers.

use crate::observer::ContextObserver;
use crate::types::{ChangeNotification, ManagedObject};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

/// An observer shared between its registration and the center.
pub type SharedObserver<O> = Arc<Mutex<ContextObserver<O>>>;

/// Unique identifier for a registered observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub u64);

/// Clears the delivery flag even if a callback panics.
struct DeliveryGuard<'a>(&'a AtomicBool);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Broadcasts change notifications to registered observers.
pub struct NotificationCenter<O> {
    /// Registered observers; ids grow monotonically, so iteration follows
    /// registration order.
    observers: RwLock<BTreeMap<ObserverId, SharedObserver<O>>>,
    /// Counter for generating observer IDs.
    next_id: AtomicU64,
    /// Notifications waiting for the current delivery to finish.
    pending_tx: Sender<ChangeNotification<O>>,
    pending_rx: Receiver<ChangeNotification<O>>,
    /// Set while a `post` call is draining the queue.
    delivering: AtomicBool,
}

impl<O: ManagedObject> NotificationCenter<O> {
    pub fn new() -> Self {
        let (pending_tx, pending_rx) = unbounded();
        Self {
            observers: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            pending_tx,
            pending_rx,
            delivering: AtomicBool::new(false),
        }
    }

    /// Register a shared observer.
    pub fn register(&self, observer: SharedObserver<O>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.observers.write().insert(id, observer);
        debug!(observer = id.0, "observer registered");
        id
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().remove(&id).is_some();
        if removed {
            debug!(observer = id.0, "observer unregistered");
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_registered(&self, id: ObserverId) -> bool {
        self.observers.read().contains_key(&id)
    }

    /// Deliver a notification to every registered observer, in registration
    /// order, on the calling thread.
    ///
    /// A post made while another delivery is in progress (for example from
    /// inside a handler callback) is queued and delivered after it. Returns
    /// the number of matches produced by this call's deliveries.
    pub fn post(&self, notification: ChangeNotification<O>) -> usize {
        // The center owns the receiver, so the channel never disconnects.
        let _ = self.pending_tx.send(notification);

        if self.delivering.swap(true, Ordering::AcqRel) {
            trace!(queued = self.pending_rx.len(), "delivery in progress, notification queued");
            return 0;
        }

        let mut matches = 0;
        loop {
            {
                let _guard = DeliveryGuard(&self.delivering);
                while let Ok(notification) = self.pending_rx.try_recv() {
                    matches += self.deliver(&notification);
                }
            }

            // Another thread may have queued after the last receive.
            if self.pending_rx.is_empty() || self.delivering.swap(true, Ordering::AcqRel) {
                break;
            }
        }
        matches
    }

    fn deliver(&self, notification: &ChangeNotification<O>) -> usize {
        // Snapshot so callbacks may register or unregister observers.
        let observers: Vec<SharedObserver<O>> = self.observers.read().values().cloned().collect();

        observers
            .iter()
            .map(|observer| observer.lock().on_notification(notification))
            .sum()
    }
}

impl<O: ManagedObject> Default for NotificationCenter<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a context observer registered with a center.
///
/// Dropping the registration unregisters the observer.
pub struct ObserverRegistration<O: ManagedObject> {
    id: ObserverId,
    observer: SharedObserver<O>,
    center: Weak<NotificationCenter<O>>,
}

impl<O: ManagedObject> ObserverRegistration<O> {
    pub fn new(center: &Arc<NotificationCenter<O>>, observer: ContextObserver<O>) -> Self {
        let observer = Arc::new(Mutex::new(observer));
        let id = center.register(Arc::clone(&observer));
        Self {
            id,
            observer,
            center: Arc::downgrade(center),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Lock the observer for configuration between deliveries.
    ///
    /// Must not be called from inside one of the observer's own callbacks.
    pub fn lock(&self) -> MutexGuard<'_, ContextObserver<O>> {
        self.observer.lock()
    }

    pub fn observer(&self) -> &SharedObserver<O> {
        &self.observer
    }

    pub fn is_registered(&self) -> bool {
        self.center
            .upgrade()
            .map(|center| center.is_registered(self.id))
            .unwrap_or(false)
    }

    /// Stop receiving notifications.
    pub fn unregister(self) {
        drop(self);
    }
}

impl<O: ManagedObject> Drop for ObserverRegistration<O> {
    fn drop(&mut self) {
        if let Some(center) = self.center.upgrade() {
            center.unregister(self.id);
        }
    }
}
