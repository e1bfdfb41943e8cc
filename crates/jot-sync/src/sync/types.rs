//! Sync-layer boundary types: the application-state accessor, orchestrator
//! options, and the bulk-delete report.

use std::sync::Arc;

use serde_json::Value;

use crate::error::StoreError;
use crate::gateway::DocumentGateway;
use crate::types::{DocState, DocumentKind, SnapshotMeta};

// ============================================================================
// StateAccessor — application-provided state surface
// ============================================================================

/// What the host application exposes to the orchestrator.
///
/// All methods are synchronous and expected to be cheap (an in-memory state
/// container, not I/O). Reads reflect the editor as the user currently sees
/// it; writes update what the user sees.
pub trait StateAccessor: Send + Sync {
    /// Current live text, caret, and cached base for one kind.
    fn doc_state(&self, kind: DocumentKind) -> DocState;

    /// Replace the live editor text and caret position.
    fn set_live_text(&self, kind: DocumentKind, text: &str, cursor: usize);

    /// Advance the cached base snapshot.
    fn set_base(&self, kind: DocumentKind, revision: u64, text: &str);

    /// Record delivery metadata from the latest snapshot.
    fn set_snapshot_meta(&self, kind: DocumentKind, meta: SnapshotMeta);

    /// Forward the external todo-extraction output, verbatim.
    fn set_structured_todos(&self, todos: &Value);

    /// Surface a sync failure to the user.
    fn set_sync_error(&self, kind: DocumentKind, message: &str);
}

// ============================================================================
// Options and reports
// ============================================================================

/// Configuration for [`SyncOrchestrator`](super::SyncOrchestrator).
pub struct OrchestratorOptions {
    pub gateway: Arc<DocumentGateway>,
    pub state: Arc<dyn StateAccessor>,
    /// Debounce window for scheduled saves in milliseconds (`None` = 1000).
    pub debounce_ms: Option<u64>,
}

/// One failed attempt in a bulk delete.
#[derive(Debug)]
pub struct DeleteFailure {
    /// `"note"`, `"todos"`, or `"profile"`.
    pub target: String,
    pub error: StoreError,
}

/// Outcome of [`delete_user_documents`](super::SyncOrchestrator::delete_user_documents).
/// Every target is attempted; failures accumulate here instead of aborting
/// the fan-out.
#[derive(Debug, Default)]
pub struct DeleteReport {
    pub failures: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}
