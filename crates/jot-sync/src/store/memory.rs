//! In-memory [`DocumentStore`] with real conditional-write semantics.
//!
//! Backs the test suite and embedded/offline hosts. Every committed write is
//! echoed to the path's subscribers, so an orchestrator wired to this store
//! observes the same snapshot traffic a networked backend would produce.
//!
//! Lock discipline: `docs`, `profiles`, and `emitters` are independent locks
//! and are never held at the same time; in particular every emitter lookup
//! happens after the `docs` guard is dropped, so listener callbacks run with
//! no store lock held.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::emitter::EventEmitter;
use super::{
    DocumentSnapshot, DocumentStore, PutReceipt, RawDocument, SnapshotCallback, StoreSubscription,
};
use crate::error::StoreError;
use crate::types::{DocumentKind, SnapshotMeta};

type DocPath = (String, DocumentKind);

#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<DocPath, Value>>,
    profiles: Mutex<HashMap<String, Value>>,
    emitters: Mutex<HashMap<DocPath, Arc<EventEmitter<DocumentSnapshot>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a raw payload unconditionally, bypassing the revision check,
    /// and notify subscribers. This is how out-of-band writers behave: the
    /// external todo-extraction job, another device, or a buggy client
    /// producing a malformed payload.
    pub fn put_raw(&self, user_id: &str, kind: DocumentKind, payload: Value) {
        let path = (user_id.to_string(), kind);
        self.docs.lock().insert(path.clone(), payload.clone());
        self.notify(&path, Some(payload));
    }

    /// Current raw payload, if any.
    pub fn raw(&self, user_id: &str, kind: DocumentKind) -> Option<Value> {
        self.docs
            .lock()
            .get(&(user_id.to_string(), kind))
            .cloned()
    }

    pub fn put_profile(&self, user_id: &str, payload: Value) {
        self.profiles.lock().insert(user_id.to_string(), payload);
    }

    pub fn profile_exists(&self, user_id: &str) -> bool {
        self.profiles.lock().contains_key(user_id)
    }

    fn emitter_for(&self, path: &DocPath) -> Arc<EventEmitter<DocumentSnapshot>> {
        self.emitters
            .lock()
            .entry(path.clone())
            .or_default()
            .clone()
    }

    fn notify(&self, path: &DocPath, payload: Option<Value>) {
        let emitter = { self.emitters.lock().get(path).cloned() };
        if let Some(emitter) = emitter {
            emitter.emit(&DocumentSnapshot {
                payload,
                meta: SnapshotMeta::default(),
            });
        }
    }

    fn now_millis() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        user_id: &str,
        kind: DocumentKind,
    ) -> Result<Option<RawDocument>, StoreError> {
        let payload = self
            .docs
            .lock()
            .get(&(user_id.to_string(), kind))
            .cloned();
        Ok(payload.map(|payload| RawDocument { payload }))
    }

    async fn put_checked(
        &self,
        user_id: &str,
        kind: DocumentKind,
        text: &str,
        expected_revision: u64,
    ) -> Result<PutReceipt, StoreError> {
        let path = (user_id.to_string(), kind);
        let committed = {
            let mut docs = self.docs.lock();
            let actual = docs
                .get(&path)
                .and_then(|p| p.get("revision"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            if actual != expected_revision {
                return Err(StoreError::RevisionMismatch {
                    expected: expected_revision,
                    actual,
                });
            }
            let entry = docs.entry(path.clone()).or_insert_with(|| json!({}));
            if !entry.is_object() {
                *entry = json!({});
            }
            if let Some(map) = entry.as_object_mut() {
                map.insert("text".to_string(), json!(text));
                map.insert("revision".to_string(), json!(expected_revision + 1));
                map.insert("updatedAt".to_string(), json!(Self::now_millis()));
            }
            entry.clone()
        };
        self.notify(&path, Some(committed));
        Ok(PutReceipt {
            revision: expected_revision + 1,
        })
    }

    async fn delete(&self, user_id: &str, kind: DocumentKind) -> Result<(), StoreError> {
        let path = (user_id.to_string(), kind);
        self.docs.lock().remove(&path);
        self.notify(&path, None);
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> Result<(), StoreError> {
        self.profiles.lock().remove(user_id);
        Ok(())
    }

    fn subscribe(
        &self,
        user_id: &str,
        kind: DocumentKind,
        on_snapshot: SnapshotCallback,
    ) -> StoreSubscription {
        let path = (user_id.to_string(), kind);
        let disposed = Arc::new(AtomicBool::new(false));

        let emitter = self.emitter_for(&path);
        let flag = disposed.clone();
        let callback = on_snapshot.clone();
        let id = emitter.on(move |snapshot: &DocumentSnapshot| {
            if !flag.load(Ordering::SeqCst) {
                callback(snapshot);
            }
        });

        // Initial snapshot, delivered synchronously on attach.
        let payload = self.docs.lock().get(&path).cloned();
        on_snapshot(&DocumentSnapshot {
            payload,
            meta: SnapshotMeta::default(),
        });

        StoreSubscription::new(disposed, move || emitter.off(id))
    }
}
