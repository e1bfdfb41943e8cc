//! Typed pub/sub primitive backing snapshot fan-out.
//!
//! One emitter exists per subscribed document path; every committed write is
//! emitted to the listeners attached at that moment. The listener list is
//! snapshotted under the lock and the lock released before any callback
//! runs, so a listener may attach or detach listeners (including itself)
//! from inside a delivery without deadlocking. A listener detached during a
//! delivery round still receives that round; one attached during a round
//! starts with the next.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Identifies a registered listener for later removal.
pub type ListenerId = u64;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct EventEmitter<T> {
    listeners: Mutex<Vec<(ListenerId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener; the returned id removes it again via [`off`](Self::off).
    pub fn on(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Unknown ids are ignored, so double removal is safe.
    pub fn off(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Deliver `event` to every listener registered when the call started.
    pub fn emit(&self, event: &T) {
        let round: Vec<Listener<T>> = {
            let listeners = self.listeners.lock();
            listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in round {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}
