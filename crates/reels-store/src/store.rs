//! The job store contract.

use async_trait::async_trait;

use reels_models::{Job, JobId, JobKind};

use crate::error::StoreResult;

/// Outcome written by a terminal transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    /// Provider finished; payload becomes `Job.result`
    Completed(serde_json::Value),
    /// Submit failed, provider reported failure, or the poll budget ran out;
    /// text becomes `Job.error` (provider detail preserved verbatim)
    Failed(String),
}

/// Durable job persistence, keyed by id and queryable by owner.
///
/// Only the orchestrator calls the mutating methods; status reads go through
/// `get`/`list_by_owner` and always reflect the last durably-recorded
/// transition.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a pending job record.
    async fn create(
        &self,
        owner_id: &str,
        kind: JobKind,
        params: serde_json::Value,
    ) -> StoreResult<Job>;

    /// Record a successful provider submission.
    ///
    /// Fails with `NotFound` for an unknown id and `InvalidTransition` unless
    /// the job is still pending.
    async fn record_submitted(&self, id: &JobId, external_ref: &str) -> StoreResult<Job>;

    /// Record a non-terminal poll response. Redundant calls are a no-op.
    async fn record_progress(&self, id: &JobId) -> StoreResult<Job>;

    /// Record a terminal outcome.
    ///
    /// Re-delivery of the identical outcome on an already-terminal job is a
    /// no-op (duplicate poll deliveries are expected); a conflicting outcome
    /// fails with `InvalidTransition`.
    async fn record_terminal(&self, id: &JobId, outcome: TerminalOutcome) -> StoreResult<Job>;

    /// Fetch a job by id.
    async fn get(&self, id: &JobId) -> StoreResult<Job>;

    /// List an owner's jobs, newest first, optionally filtered by kind.
    async fn list_by_owner(&self, owner_id: &str, kind: Option<JobKind>) -> StoreResult<Vec<Job>>;

    /// Remove a job from its owner's history.
    ///
    /// Fails with `NotFound` when the id is unknown or owned by someone else;
    /// existence is never revealed to non-owners.
    async fn delete(&self, owner_id: &str, id: &JobId) -> StoreResult<()>;
}

/// Apply a terminal outcome to a job in place. Shared by all backends so the
/// idempotent re-delivery rule is identical everywhere.
pub(crate) fn apply_terminal(
    job: &mut Job,
    outcome: &TerminalOutcome,
) -> Result<(), reels_models::TransitionError> {
    match outcome {
        TerminalOutcome::Completed(result) => job.mark_completed(result.clone()),
        TerminalOutcome::Failed(error) => job.mark_failed(error.clone()),
    }
}
