// Recruiter funnel: saved candidates moved between pipeline stages with
// optimistic updates, rollback and per-entry serialization.
// The persistence call is the only outbound dependency, behind `StageBackend`.

pub mod backend;
pub mod stage_store;

pub use backend::{BackendError, HttpStageBackend, LocalStageBackend, StageBackend};
pub use stage_store::{BulkResult, PipelineStageStore, Transition};
