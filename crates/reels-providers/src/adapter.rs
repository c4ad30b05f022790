//! The provider adapter contract.

use async_trait::async_trait;

use reels_models::{JobKind, JobParams};

use crate::error::ProviderResult;

/// Result of handing work to a provider.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Provider-assigned identifier used for subsequent polling
    pub external_ref: String,
    /// Set when the provider finished the work within the submit round trip
    /// (transcript analysis has no real async phase). The orchestrator then
    /// records completion directly and never schedules polling.
    pub immediate_result: Option<serde_json::Value>,
}

impl Submission {
    pub fn deferred(external_ref: impl Into<String>) -> Self {
        Self {
            external_ref: external_ref.into(),
            immediate_result: None,
        }
    }

    pub fn immediate(external_ref: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            external_ref: external_ref.into(),
            immediate_result: Some(result),
        }
    }
}

/// Provider status normalized onto the generic vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Work is still running
    InProgress,
    /// Work finished; payload becomes `Job.result`
    Completed(serde_json::Value),
    /// The job itself failed on the provider side (distinct from a transient
    /// error reaching the provider)
    Failed(String),
}

/// A completed job's output.
#[derive(Debug, Clone)]
pub enum Artifact {
    /// Raw media bytes streamed back to the caller
    Bytes {
        content_type: String,
        data: Vec<u8>,
    },
    /// Provider-hosted URL the caller fetches directly
    Url(String),
}

/// One external capability: submit work, poll it, fetch its output.
///
/// `poll` must be idempotent and side-effect-free; repeated polling never
/// mutates provider state.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The job kind this adapter backs.
    fn kind(&self) -> JobKind;

    /// Hand work to the provider.
    async fn submit(&self, params: &JobParams) -> ProviderResult<Submission>;

    /// Fetch the provider's current status for submitted work.
    async fn poll(&self, external_ref: &str) -> ProviderResult<PollOutcome>;

    /// Fetch the completed output. Fails with `NotReady` before completion.
    async fn fetch_artifact(&self, external_ref: &str) -> ProviderResult<Artifact>;
}
