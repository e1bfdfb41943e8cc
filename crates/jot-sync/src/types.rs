//! Core data shapes shared across the merge, store, gateway, and sync layers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// DocumentKind
// ============================================================================

/// The two document kinds a user owns. Each kind is synchronized
/// independently: its own subscription, its own debounce timer, its own base
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Note,
    Todos,
}

impl DocumentKind {
    /// Every kind, in a stable order. Iterated by the orchestrator for
    /// start/stop/initial-sync/delete fan-out.
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Note, DocumentKind::Todos];

    /// Stable string form, used as the store path segment.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Note => "note",
            DocumentKind::Todos => "todos",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Document — decoded remote payload
// ============================================================================

/// A remote document after the strict decode step.
///
/// Raw payloads cross the store boundary as `serde_json::Value`; this is the
/// normalized shape the rest of the engine works with.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    /// Monotonic write counter. Absent on the wire decodes as 0.
    pub revision: u64,
    /// Server-assigned write timestamp, epoch milliseconds. The client never
    /// fabricates this value.
    pub updated_at: Option<i64>,
    /// Opaque output of the external todo-extraction job. Never interpreted
    /// here, only forwarded to the application for [`DocumentKind::Todos`].
    pub structured_todos: Option<Value>,
}

impl Document {
    /// Decode a raw store payload.
    ///
    /// Returns `None` when the payload has no string `text` field — a
    /// malformed (or deleted) document is a metadata-only update, not an
    /// error. A missing or non-integer `revision` decodes as 0.
    pub fn decode(payload: &Value) -> Option<Document> {
        let text = payload.get("text")?.as_str()?.to_string();
        let revision = payload
            .get("revision")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let updated_at = payload.get("updatedAt").and_then(Value::as_i64);
        let structured_todos = payload.get("structuredTodos").cloned();
        Some(Document {
            text,
            revision,
            updated_at,
            structured_todos,
        })
    }
}

// ============================================================================
// Base snapshot and editor state
// ============================================================================

/// The last known server state for one document kind: the ancestor every
/// three-way merge runs against and the expected revision every conditional
/// write asserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseSnapshot {
    pub revision: u64,
    pub text: String,
}

impl BaseSnapshot {
    pub fn new(revision: u64, text: impl Into<String>) -> Self {
        Self {
            revision,
            text: text.into(),
        }
    }
}

/// Delivery metadata attached to every store snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// True while the snapshot reflects a local write not yet acknowledged
    /// by the server.
    pub has_pending_writes: bool,
    /// True when the snapshot was served from a local cache while offline.
    pub from_cache: bool,
}

/// What the orchestrator reads back from the application per kind: the live
/// editor text, the caret position, and the cached base snapshot.
#[derive(Debug, Clone, Default)]
pub struct DocState {
    pub live_text: String,
    pub live_cursor: usize,
    pub base: BaseSnapshot,
}

/// Clamp a caret position into `text`.
///
/// Counts characters, not bytes, so multi-byte text can never produce an
/// out-of-bounds caret.
pub fn clamp_cursor(cursor: usize, text: &str) -> usize {
    cursor.min(text.chars().count())
}

// ============================================================================
// Tests
// ============================================================================
