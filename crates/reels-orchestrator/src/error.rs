//! Orchestrator error types.

use reels_models::JobKind;
use reels_providers::ProviderError;
use reels_store::StoreError;
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Caller-supplied params failed validation before any external call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No adapter registered for this kind.
    #[error("No provider registered for kind {0}")]
    UnsupportedKind(JobKind),

    /// Unknown job, or a job the requester does not own. Ownership failures
    /// deliberately look identical to a missing job.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Artifact requested before the job completed.
    #[error("Job is not ready")]
    NotReady,

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl From<StoreError> for OrchestratorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => OrchestratorError::NotFound(id),
            other => OrchestratorError::Store(other),
        }
    }
}
