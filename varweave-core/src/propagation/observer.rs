//! Observers
//!
//! Observers are told when a value is committed or the dependency graph
//! changes shape. Notifications are advisory: nothing they return is used,
//! and they run after the change has already been made.
//!
//! The engine only queues notifications while it works on a store. They are
//! delivered by `ObserverSet::flush`, which `Document` calls after releasing
//! its lock, so an observer may call straight back into the same document.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

/// Unique identifier for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Generate a new unique observer ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives change notifications. Both methods default to no-ops.
pub trait Observer: Send + Sync {
    /// A variable's value was committed.
    fn on_variable_changed(&self, _name: &str, _value: &Value) {}

    /// Variables or dependency edges were added, removed or renamed.
    fn on_dependency_graph_changed(&self) {}
}

/// A notification, as delivered to a `CallbackObserver`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification<'a> {
    VariableChanged { name: &'a str, value: &'a Value },
    GraphChanged,
}

/// Observer that forwards every notification to a closure.
pub struct CallbackObserver {
    notify: Box<dyn Fn(Notification<'_>) + Send + Sync>,
}

impl CallbackObserver {
    pub fn new<F>(notify: F) -> Self
    where
        F: Fn(Notification<'_>) + Send + Sync + 'static,
    {
        Self {
            notify: Box::new(notify),
        }
    }
}

impl Observer for CallbackObserver {
    fn on_variable_changed(&self, name: &str, value: &Value) {
        (self.notify)(Notification::VariableChanged { name, value });
    }

    fn on_dependency_graph_changed(&self) {
        (self.notify)(Notification::GraphChanged);
    }
}

/// A queued notification, owned so it can outlive the store borrow.
#[derive(Debug, Clone, PartialEq)]
enum Pending {
    VariableChanged { name: String, value: Value },
    GraphChanged,
}

/// The observers registered on one document.
#[derive(Default)]
pub struct ObserverSet {
    observers: RwLock<Vec<(ObserverId, Arc<dyn Observer>)>>,
    pending: Mutex<Vec<Pending>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Returns the id needed to unsubscribe.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId::new();
        self.observers.write().push((id, observer));
        id
    }

    /// Register a closure as an observer.
    pub fn subscribe_fn<F>(&self, notify: F) -> ObserverId
    where
        F: Fn(Notification<'_>) + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(CallbackObserver::new(notify)))
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    pub fn notify_variable_changed(&self, name: &str, value: &Value) {
        for observer in self.snapshot() {
            observer.on_variable_changed(name, value);
        }
    }

    pub fn notify_graph_changed(&self) {
        for observer in self.snapshot() {
            observer.on_dependency_graph_changed();
        }
    }

    /// Queue a value notification for the next `flush`.
    pub fn enqueue_variable_changed(&self, name: &str, value: &Value) {
        if self.is_empty() {
            return;
        }
        self.pending.lock().push(Pending::VariableChanged {
            name: name.to_string(),
            value: value.clone(),
        });
    }

    /// Queue a graph notification for the next `flush`.
    pub fn enqueue_graph_changed(&self) {
        if self.is_empty() {
            return;
        }
        self.pending.lock().push(Pending::GraphChanged);
    }

    /// Number of queued notifications.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Deliver every queued notification, in the order they were queued.
    pub fn flush(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for notification in pending {
            match notification {
                Pending::VariableChanged { name, value } => {
                    self.notify_variable_changed(&name, &value)
                }
                Pending::GraphChanged => self.notify_graph_changed(),
            }
        }
    }

    // Release the lock before calling out, so observers may (un)subscribe.
    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl std::fmt::Debug for ObserverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSet")
            .field("count", &self.len())
            .field("pending", &self.pending())
            .finish()
    }
}
