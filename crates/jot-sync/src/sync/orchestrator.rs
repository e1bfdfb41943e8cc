//! SyncOrchestrator — wires store subscriptions, debounced saves, initial
//! sync, and bulk deletion together for one user's documents.
//!
//! The orchestrator is an explicitly constructed, explicitly owned service:
//! build it with [`SyncOrchestrator::new`], hold it as an `Arc`, and call
//! `stop_listening` when done. Each [`DocumentKind`] is synchronized
//! independently — its own subscription, its own debounce timer, its own
//! base snapshot — so one kind's failure never stalls the other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StoreError, SyncError};
use crate::gateway::{DocumentGateway, SaveOutcome, SubscriptionHandle, UpdateCallback};
use crate::types::{clamp_cursor, Document, DocumentKind, SnapshotMeta};

use super::debounce::DebounceSlots;
use super::types::{DeleteFailure, DeleteReport, OrchestratorOptions, StateAccessor};

const DEFAULT_DEBOUNCE_MS: u64 = 1000;

pub struct SyncOrchestrator {
    gateway: Arc<DocumentGateway>,
    state: Arc<dyn StateAccessor>,
    debounce: Duration,
    subscriptions: Mutex<HashMap<DocumentKind, SubscriptionHandle>>,
    timers: DebounceSlots,
    stopped: AtomicBool,
}

impl SyncOrchestrator {
    pub fn new(options: OrchestratorOptions) -> Arc<Self> {
        Arc::new(Self {
            gateway: options.gateway,
            state: options.state,
            debounce: Duration::from_millis(
                options.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
            ),
            subscriptions: Mutex::new(HashMap::new()),
            timers: DebounceSlots::default(),
            stopped: AtomicBool::new(false),
        })
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Attach a snapshot listener for every kind.
    ///
    /// Idempotent: any listener from an earlier call is disposed before its
    /// replacement attaches, so repeated starts never double-deliver.
    pub fn start_listening(self: &Arc<Self>, user_id: &str) {
        self.stopped.store(false, Ordering::SeqCst);
        for kind in DocumentKind::ALL {
            let previous = self.subscriptions.lock().remove(&kind);
            if let Some(previous) = previous {
                previous.dispose();
            }

            // The callback holds a Weak reference: the store's listener
            // registry must not keep a dropped orchestrator alive.
            let weak = Arc::downgrade(self);
            let on_update: UpdateCallback = Arc::new(move |doc, meta| {
                if let Some(orchestrator) = weak.upgrade() {
                    orchestrator.handle_remote_update(kind, doc, meta);
                }
            });
            let handle = self.gateway.subscribe(user_id, kind, on_update);
            self.subscriptions.lock().insert(kind, handle);
            debug!(%kind, "listening");
        }
    }

    /// Dispose every subscription and cancel every pending debounce timer.
    ///
    /// No callback is delivered and no timer fires after this returns; a
    /// save whose timer already fired may still finish in flight.
    pub fn stop_listening(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let handles: Vec<SubscriptionHandle> = {
            let mut subscriptions = self.subscriptions.lock();
            subscriptions.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.dispose();
        }
        self.timers.cancel_all();
        debug!("stopped");
    }

    fn handle_remote_update(
        &self,
        kind: DocumentKind,
        doc: Option<Document>,
        meta: SnapshotMeta,
    ) {
        self.state.set_snapshot_meta(kind, meta);

        let Some(doc) = doc else {
            // Absent or malformed payload: metadata-only update.
            return;
        };

        if kind == DocumentKind::Todos {
            if let Some(todos) = &doc.structured_todos {
                self.state.set_structured_todos(todos);
            }
        }

        let current = self.state.doc_state(kind);
        if doc.revision == current.base.revision && doc.text == current.base.text {
            // Echo of a state this client already accounted for.
            return;
        }

        self.state.set_base(kind, doc.revision, &doc.text);

        if doc.text != current.live_text {
            let cursor = clamp_cursor(current.live_cursor, &doc.text);
            self.state.set_live_text(kind, &doc.text, cursor);
        }
    }

    // ------------------------------------------------------------------
    // Debounced saves
    // ------------------------------------------------------------------

    /// Schedule `text` to be saved after the debounce window.
    ///
    /// Re-scheduling within the window cancels the previous timer, so a
    /// typing burst collapses into one write carrying the last text. Kinds
    /// debounce independently. Fails with [`SyncError::Stopped`] after
    /// `stop_listening`.
    pub fn schedule_save(
        self: &Arc<Self>,
        user_id: &str,
        kind: DocumentKind,
        text: &str,
    ) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(SyncError::Stopped);
        }

        let cancelled = self.timers.rearm(kind);
        let orchestrator = self.clone();
        let user_id = user_id.to_string();
        let text = text.to_string();
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            orchestrator.run_save(&user_id, kind, &text).await;
        });
        Ok(())
    }

    async fn run_save(&self, user_id: &str, kind: DocumentKind, text: &str) {
        let base = self.state.doc_state(kind).base;
        match self
            .gateway
            .save(user_id, kind, text, base.revision, &base.text)
            .await
        {
            Ok(outcome) => self.apply_save_outcome(kind, text, outcome),
            Err(e) => {
                warn!(%kind, error = %e, "save failed");
                self.state
                    .set_sync_error(kind, &format!("Failed to write to cloud: {e}"));
            }
        }
    }

    /// Advance the base past a completed save; when a conflict merge
    /// changed the text, correct the live document too.
    fn apply_save_outcome(&self, kind: DocumentKind, sent_text: &str, outcome: SaveOutcome) {
        self.state
            .set_base(kind, outcome.new_revision, &outcome.final_text);
        if outcome.was_conflicted && outcome.final_text != sent_text {
            let cursor = self.state.doc_state(kind).live_cursor;
            self.state.set_live_text(
                kind,
                &outcome.final_text,
                clamp_cursor(cursor, &outcome.final_text),
            );
        }
    }

    // ------------------------------------------------------------------
    // Initial sync
    // ------------------------------------------------------------------

    /// Reconcile local and remote state once, per kind.
    ///
    /// A kind whose remote document exists with non-empty text adopts the
    /// remote as base (live text untouched — the subscription decides
    /// whether to overwrite). A kind with no remote text pushes the local
    /// text up through the normal save path. Failures are reported per
    /// kind and do not stop the other kind.
    pub async fn perform_initial_sync(self: &Arc<Self>, user_id: &str) {
        for kind in DocumentKind::ALL {
            if let Err(e) = self.initial_sync_kind(user_id, kind).await {
                warn!(%kind, error = %e, "initial sync failed");
                self.state
                    .set_sync_error(kind, &format!("Failed to load from cloud: {e}"));
            }
        }
    }

    async fn initial_sync_kind(
        &self,
        user_id: &str,
        kind: DocumentKind,
    ) -> std::result::Result<(), StoreError> {
        match self.gateway.load(user_id, kind).await? {
            Some(doc) if !doc.text.is_empty() => {
                self.state.set_base(kind, doc.revision, &doc.text);
                Ok(())
            }
            _ => {
                // Nothing remote worth adopting: seed the store from local
                // state. An empty-text remote at a nonzero revision takes
                // the conflict path inside the gateway and lands cleanly.
                let live = self.state.doc_state(kind).live_text;
                let outcome = self.gateway.save(user_id, kind, &live, 0, "").await?;
                self.apply_save_outcome(kind, &live, outcome);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Bulk deletion
    // ------------------------------------------------------------------

    /// Delete both documents and the profile record, concurrently.
    ///
    /// Every target is attempted regardless of sibling outcomes; failures
    /// are collected, never thrown.
    pub async fn delete_user_documents(&self, user_id: &str) -> DeleteReport {
        let (note, todos, profile) = tokio::join!(
            self.gateway.delete(user_id, DocumentKind::Note),
            self.gateway.delete(user_id, DocumentKind::Todos),
            self.gateway.delete_profile(user_id),
        );

        let mut report = DeleteReport::default();
        let mut record = |target: &str, result: std::result::Result<(), StoreError>| {
            if let Err(error) = result {
                warn!(error = %error, "delete of {target} failed");
                report.failures.push(DeleteFailure {
                    target: target.to_string(),
                    error,
                });
            }
        };
        record(DocumentKind::Note.as_str(), note);
        record(DocumentKind::Todos.as_str(), todos);
        record("profile", profile);
        report
    }
}
