//! DocumentGateway save/load tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use jot_sync::error::StoreError;
use jot_sync::gateway::DocumentGateway;
use jot_sync::store::memory::MemoryStore;
use jot_sync::store::{
    DocumentStore, PutReceipt, RawDocument, SnapshotCallback, StoreSubscription,
};
use jot_sync::types::DocumentKind;

const USER: &str = "user-1";

// ============================================================================
// Mock store: counts puts, fails them on demand
// ============================================================================

type PutHook = Box<dyn Fn(u64) -> Option<StoreError> + Send + Sync>;

struct MockStore {
    inner: MemoryStore,
    put_calls: AtomicUsize,
    put_hook: parking_lot::Mutex<Option<PutHook>>,
}

impl MockStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            put_calls: AtomicUsize::new(0),
            put_hook: parking_lot::Mutex::new(None),
        }
    }

    fn on_put(&self, f: impl Fn(u64) -> Option<StoreError> + Send + Sync + 'static) {
        *self.put_hook.lock() = Some(Box::new(f));
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn get(
        &self,
        user_id: &str,
        kind: DocumentKind,
    ) -> Result<Option<RawDocument>, StoreError> {
        self.inner.get(user_id, kind).await
    }

    async fn put_checked(
        &self,
        user_id: &str,
        kind: DocumentKind,
        text: &str,
        expected_revision: u64,
    ) -> Result<PutReceipt, StoreError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let injected = {
            let hook = self.put_hook.lock();
            hook.as_ref().and_then(|f| f(expected_revision))
        };
        if let Some(error) = injected {
            return Err(error);
        }
        self.inner
            .put_checked(user_id, kind, text, expected_revision)
            .await
    }

    async fn delete(&self, user_id: &str, kind: DocumentKind) -> Result<(), StoreError> {
        self.inner.delete(user_id, kind).await
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError> {
        self.inner.delete_profile(user_id).await
    }

    fn subscribe(
        &self,
        user_id: &str,
        kind: DocumentKind,
        on_snapshot: SnapshotCallback,
    ) -> StoreSubscription {
        self.inner.subscribe(user_id, kind, on_snapshot)
    }
}

fn gateway_over(store: Arc<MockStore>) -> DocumentGateway {
    DocumentGateway::new(store)
}

// ============================================================================
// Clean saves
// ============================================================================

#[tokio::test]
async fn clean_save_bumps_the_revision_by_one() {
    let store = Arc::new(MemoryStore::new());
    let gateway = DocumentGateway::new(store.clone());

    let first = gateway
        .save(USER, DocumentKind::Note, "hello", 0, "")
        .await
        .unwrap();
    assert_eq!(first.new_revision, 1);
    assert_eq!(first.final_text, "hello");
    assert!(!first.was_conflicted);

    let second = gateway
        .save(USER, DocumentKind::Note, "hello world", 1, "hello")
        .await
        .unwrap();
    assert_eq!(second.new_revision, 2);
    assert!(!second.was_conflicted);

    let doc = gateway.load(USER, DocumentKind::Note).await.unwrap().unwrap();
    assert_eq!(doc.text, "hello world");
    assert_eq!(doc.revision, 2);
    assert!(doc.updated_at.is_some());
}

#[tokio::test]
async fn save_preserves_unrelated_payload_fields() {
    let store = Arc::new(MemoryStore::new());
    let gateway = DocumentGateway::new(store.clone());

    // The external batch job wrote structured todos alongside rev 1.
    store.put_raw(
        USER,
        DocumentKind::Todos,
        json!({"text": "- milk", "revision": 1, "structuredTodos": {"items": ["milk"]}}),
    );

    gateway
        .save(USER, DocumentKind::Todos, "- milk\n- eggs", 1, "- milk")
        .await
        .unwrap();

    let doc = gateway
        .load(USER, DocumentKind::Todos)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.text, "- milk\n- eggs");
    assert_eq!(doc.revision, 2);
    assert_eq!(doc.structured_todos, Some(json!({"items": ["milk"]})));
}

// ============================================================================
// Conflict path
// ============================================================================

#[tokio::test]
async fn conflict_merges_against_the_observed_remote_and_retries_once() {
    let store = Arc::new(MemoryStore::new());
    let gateway = DocumentGateway::new(store.clone());

    // Another client committed rev 2 while we were editing on top of rev 1.
    store.put_raw(
        USER,
        DocumentKind::Note,
        json!({"text": "Line1\nLine2\nLine3 changed", "revision": 2}),
    );

    let outcome = gateway
        .save(
            USER,
            DocumentKind::Note,
            "Line1 changed\nLine2\nLine3",
            1,
            "Line1\nLine2\nLine3",
        )
        .await
        .unwrap();

    assert!(outcome.was_conflicted);
    assert_eq!(outcome.new_revision, 3);
    assert_eq!(outcome.final_text, "Line1 changed\nLine2\nLine3 changed");

    let doc = gateway.load(USER, DocumentKind::Note).await.unwrap().unwrap();
    assert_eq!(doc.text, "Line1 changed\nLine2\nLine3 changed");
    assert_eq!(doc.revision, 3);
}

#[tokio::test]
async fn second_mismatch_during_the_retry_propagates() {
    let store = Arc::new(MockStore::new());
    store.inner.put_raw(
        USER,
        DocumentKind::Note,
        json!({"text": "remote", "revision": 5}),
    );
    // Every conditional write loses its race.
    store.on_put(|expected| {
        Some(StoreError::RevisionMismatch {
            expected,
            actual: expected + 1,
        })
    });
    let gateway = gateway_over(store.clone());

    let result = gateway.save(USER, DocumentKind::Note, "local", 4, "base").await;

    let err = result.unwrap_err();
    assert!(err.is_revision_mismatch());
    // One initial attempt plus exactly one retry — never a third.
    assert_eq!(store.put_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_conflict_errors_propagate_without_a_retry() {
    let store = Arc::new(MockStore::new());
    store.on_put(|_| Some(StoreError::Transport("offline".to_string())));
    let gateway = gateway_over(store.clone());

    let result = gateway.save(USER, DocumentKind::Note, "text", 0, "").await;

    assert!(matches!(result, Err(StoreError::Transport(_))));
    assert_eq!(store.put_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn conflict_against_a_malformed_remote_merges_as_empty() {
    let store = Arc::new(MemoryStore::new());
    let gateway = DocumentGateway::new(store.clone());

    // A buggy writer produced a payload without usable text. Its revision
    // is unreadable through the decode step, so the retry asserts rev 0
    // and loses to the stored rev 5.
    store.put_raw(
        USER,
        DocumentKind::Note,
        json!({"text": 42, "revision": 5}),
    );

    let result = gateway.save(USER, DocumentKind::Note, "draft", 0, "").await;
    let err = result.unwrap_err();
    assert!(err.is_revision_mismatch());
}

// ============================================================================
// Loads
// ============================================================================

#[tokio::test]
async fn load_decodes_malformed_and_absent_as_none() {
    let store = Arc::new(MemoryStore::new());
    let gateway = DocumentGateway::new(store.clone());

    assert!(gateway.load(USER, DocumentKind::Note).await.unwrap().is_none());

    store.put_raw(USER, DocumentKind::Note, json!({"revision": 3}));
    assert!(gateway.load(USER, DocumentKind::Note).await.unwrap().is_none());
}
