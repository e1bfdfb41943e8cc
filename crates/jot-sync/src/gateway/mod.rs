//! DocumentGateway — the persistence seam between the sync layer and the
//! remote store.
//!
//! Owns the two policies the rest of the engine relies on: payload decoding
//! (raw `Value`s never leak upward) and conflict handling for conditional
//! writes (merge against the observed remote state and retry exactly once).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::merge::{self, MergeConfig};
use crate::store::{DocumentSnapshot, DocumentStore, SnapshotCallback, StoreSubscription};
use crate::types::{Document, DocumentKind, SnapshotMeta};

// ============================================================================
// Outcome and callback types
// ============================================================================

/// What a completed save settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub new_revision: u64,
    /// The text the store now holds. Differs from the submitted text only
    /// after a conflict merge.
    pub final_text: String,
    pub was_conflicted: bool,
}

/// Decoded-update callback for gateway subscriptions. `None` means the
/// document is absent or its payload failed to decode; the metadata still
/// applies either way.
pub type UpdateCallback = Arc<dyn Fn(Option<Document>, SnapshotMeta) + Send + Sync>;

// ============================================================================
// DocumentGateway
// ============================================================================

pub struct DocumentGateway {
    store: Arc<dyn DocumentStore>,
    merge: MergeConfig,
}

impl DocumentGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_merge_config(store, MergeConfig::default())
    }

    pub fn with_merge_config(store: Arc<dyn DocumentStore>, merge: MergeConfig) -> Self {
        Self { store, merge }
    }

    /// Point read and decode. A malformed payload loads as `None`, the same
    /// as an absent document.
    pub async fn load(
        &self,
        user_id: &str,
        kind: DocumentKind,
    ) -> Result<Option<Document>, StoreError> {
        let raw = self.store.get(user_id, kind).await?;
        Ok(raw.and_then(|raw| Document::decode(&raw.payload)))
    }

    /// Revision-checked save with merge-on-conflict.
    ///
    /// The happy path is a single conditional write of `local_text` at
    /// `expected_revision`. When that write loses a revision race, the
    /// gateway re-reads the remote state, three-way merges it with the local
    /// text against `base_text`, and retries the conditional write once at
    /// the revision it just observed. A second mismatch means a third writer
    /// raced the retry; it propagates to the caller, whose local text is
    /// untouched and whose next save will start over from fresher state.
    pub async fn save(
        &self,
        user_id: &str,
        kind: DocumentKind,
        local_text: &str,
        expected_revision: u64,
        base_text: &str,
    ) -> Result<SaveOutcome, StoreError> {
        match self
            .store
            .put_checked(user_id, kind, local_text, expected_revision)
            .await
        {
            Ok(receipt) => Ok(SaveOutcome {
                new_revision: receipt.revision,
                final_text: local_text.to_string(),
                was_conflicted: false,
            }),
            Err(StoreError::RevisionMismatch { expected, actual }) => {
                debug!(%kind, expected, actual, "conditional write lost a revision race");

                // Absent or malformed remote merges as the empty document.
                let (remote_revision, remote_text) = match self.load(user_id, kind).await? {
                    Some(doc) => (doc.revision, doc.text),
                    None => (0, String::new()),
                };

                let outcome =
                    merge::resolve_with(&self.merge, base_text, local_text, &remote_text);
                let receipt = self
                    .store
                    .put_checked(user_id, kind, &outcome.merged_text, remote_revision)
                    .await?;
                Ok(SaveOutcome {
                    new_revision: receipt.revision,
                    final_text: outcome.merged_text,
                    was_conflicted: true,
                })
            }
            Err(other) => Err(other),
        }
    }

    pub async fn delete(&self, user_id: &str, kind: DocumentKind) -> Result<(), StoreError> {
        self.store.delete(user_id, kind).await
    }

    pub async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.delete_profile(user_id).await
    }

    /// Subscribe to one document path, with payloads decoded before
    /// delivery.
    ///
    /// The returned handle enforces the disposal contract on its own flag,
    /// independent of the store implementation: after `dispose()` returns,
    /// `on_update` is never invoked again.
    pub fn subscribe(
        &self,
        user_id: &str,
        kind: DocumentKind,
        on_update: UpdateCallback,
    ) -> SubscriptionHandle {
        let disposed = Arc::new(AtomicBool::new(false));
        let flag = disposed.clone();
        let callback: SnapshotCallback = Arc::new(move |snapshot: &DocumentSnapshot| {
            if flag.load(Ordering::SeqCst) {
                return;
            }
            let doc = snapshot.payload.as_ref().and_then(Document::decode);
            on_update(doc, snapshot.meta);
        });
        let inner = self.store.subscribe(user_id, kind, callback);
        SubscriptionHandle { disposed, inner }
    }
}

// ============================================================================
// SubscriptionHandle
// ============================================================================

/// Disposer for a gateway subscription.
pub struct SubscriptionHandle {
    disposed: Arc<AtomicBool>,
    inner: StoreSubscription,
}

impl SubscriptionHandle {
    /// Stop deliveries and detach the underlying store listener. Idempotent.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}
