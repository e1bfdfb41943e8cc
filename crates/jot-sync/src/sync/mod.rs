//! Sync orchestration layer.

mod debounce;
pub mod orchestrator;
pub mod types;

pub use orchestrator::SyncOrchestrator;
pub use types::{DeleteFailure, DeleteReport, OrchestratorOptions, StateAccessor};
