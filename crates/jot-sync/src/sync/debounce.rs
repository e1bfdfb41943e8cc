//! Per-kind cancellable debounce slots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::DocumentKind;

/// One cancellation flag per document kind.
///
/// Rearming a kind trips the previous flag, so a timer task already asleep
/// on the old arm wakes up to a no-op. The flag travels with the spawned
/// task; the map only remembers the latest arm per kind.
#[derive(Default)]
pub(super) struct DebounceSlots {
    slots: Mutex<HashMap<DocumentKind, Arc<AtomicBool>>>,
}

impl DebounceSlots {
    /// Cancel the outstanding timer for `kind` (if any) and hand back a
    /// fresh flag for the new one.
    pub fn rearm(&self, kind: DocumentKind) -> Arc<AtomicBool> {
        let fresh = Arc::new(AtomicBool::new(false));
        if let Some(previous) = self.slots.lock().insert(kind, fresh.clone()) {
            previous.store(true, Ordering::SeqCst);
        }
        fresh
    }

    /// Cancel every outstanding timer.
    pub fn cancel_all(&self) {
        for (_, flag) in self.slots.lock().drain() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}
