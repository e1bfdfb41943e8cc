//! The remote document store boundary.
//!
//! Everything above this module talks to persistence through the
//! [`DocumentStore`] trait object. Payloads cross the boundary as raw
//! `serde_json::Value`s; decoding happens in the gateway.

pub mod emitter;
pub mod memory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{DocumentKind, SnapshotMeta};

// ============================================================================
// Wire shapes
// ============================================================================

/// An undecoded document payload.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub payload: Value,
}

/// Acknowledgement of a successful conditional write.
#[derive(Debug, Clone, Copy)]
pub struct PutReceipt {
    /// The revision the store committed (`expected + 1`).
    pub revision: u64,
}

/// One delivery to a subscriber: the document's current payload (or `None`
/// when absent) plus delivery metadata.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub payload: Option<Value>,
    pub meta: SnapshotMeta,
}

/// Callback invoked for every snapshot delivered to a subscription.
pub type SnapshotCallback = Arc<dyn Fn(&DocumentSnapshot) + Send + Sync>;

// ============================================================================
// DocumentStore
// ============================================================================

/// The persistence backend: one document per `(user, kind)` path plus a
/// sibling per-user profile record.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point read of the raw payload. `Ok(None)` when the document does not
    /// exist.
    async fn get(
        &self,
        user_id: &str,
        kind: DocumentKind,
    ) -> Result<Option<RawDocument>, StoreError>;

    /// Transactional conditional write.
    ///
    /// Reads the current revision inside the transaction (an absent document
    /// counts as revision 0). If it equals `expected_revision`, commits
    /// `text` with revision `expected_revision + 1` and a server-assigned
    /// `updatedAt`, preserving unrelated payload fields; otherwise fails
    /// with [`StoreError::RevisionMismatch`] and writes nothing.
    async fn put_checked(
        &self,
        user_id: &str,
        kind: DocumentKind,
        text: &str,
        expected_revision: u64,
    ) -> Result<PutReceipt, StoreError>;

    /// Unconditional delete. Succeeds even if the document is absent.
    async fn delete(&self, user_id: &str, kind: DocumentKind) -> Result<(), StoreError>;

    /// Remove the user's profile record.
    async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError>;

    /// Attach a snapshot listener for one document path.
    ///
    /// The disposer is returned synchronously; attachment may complete in
    /// the background behind it. Setup failure is silent — the subscription
    /// simply never delivers. Implementations must deliver the current
    /// snapshot on attach and must never invoke the callback after
    /// [`StoreSubscription::dispose`] has returned.
    fn subscribe(
        &self,
        user_id: &str,
        kind: DocumentKind,
        on_snapshot: SnapshotCallback,
    ) -> StoreSubscription;
}

// ============================================================================
// StoreSubscription
// ============================================================================

/// Handle to an active snapshot listener.
///
/// Disposal is at-most-once: the teardown closure runs on the first
/// [`dispose`](Self::dispose) call only, and the shared flag lets the store's
/// delivery path suppress callbacks that race with disposal.
pub struct StoreSubscription {
    disposed: Arc<AtomicBool>,
    teardown: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl StoreSubscription {
    /// Build a subscription around a shared disposed flag and a teardown
    /// closure. The store checks the same flag before every delivery.
    pub fn new(disposed: Arc<AtomicBool>, teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            disposed,
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// Detach the listener. Safe to call more than once.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(teardown) = self.teardown.lock().take() {
            teardown();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
