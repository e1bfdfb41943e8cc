use thiserror::Error;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors surfaced by the document store and the persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The conditional write observed a revision other than the expected one.
    ///
    /// This is a control-flow signal, not a failure: the gateway reacts by
    /// merging against the latest remote state and retrying once. It only
    /// reaches callers when the retry itself loses another race.
    #[error("Revision mismatch: expected {expected}, store has {actual}")]
    RevisionMismatch { expected: u64, actual: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

impl StoreError {
    pub fn is_revision_mismatch(&self) -> bool {
        matches!(self, StoreError::RevisionMismatch { .. })
    }
}

// ---------------------------------------------------------------------------
// SyncError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Sync orchestrator is stopped")]
    Stopped,
}

/// Convenience alias — the default error type is `SyncError`.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
