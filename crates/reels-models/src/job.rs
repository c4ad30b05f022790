//! Job definitions for external-provider orchestration.
//!
//! A [`Job`] tracks one unit of asynchronous work delegated to a third-party
//! media provider (analysis, dubbing, avatar generation). Its status moves
//! monotonically along `pending -> submitted -> processing -> {completed|failed}`;
//! the transition guard lives here so every store backend enforces the same
//! state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of external work a job delegates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// LLM analysis of a reel transcript
    VideoAnalysis,
    /// Video/audio dubbing into another language
    Dubbing,
    /// AI avatar video generation
    AvatarVideo,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::VideoAnalysis => "video_analysis",
            JobKind::Dubbing => "dubbing",
            JobKind::AvatarVideo => "avatar_video",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job state in the orchestration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Record exists, not yet handed to any provider
    #[default]
    Pending,
    /// Provider accepted the work and returned an external reference
    Submitted,
    /// At least one poll came back non-terminal
    Processing,
    /// Provider finished successfully; result populated
    Completed,
    /// Submit failed, provider reported failure, or the poll budget ran out
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Submitted => "submitted",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Check whether moving from `self` to `next` is a legal forward step.
    ///
    /// `Failed` is reachable from any non-terminal state (a submit that never
    /// produced an external ref fails straight from `Pending`); `Completed`
    /// requires a successful submission but not an intermediate poll (the
    /// first poll, or the submit round trip itself, may come back terminal).
    /// Terminal states admit no further transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Pending | Submitted | Processing, Failed) => true,
            (Pending, Submitted) => true,
            (Submitted, Processing) => true,
            (Submitted | Processing, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted backward or post-terminal status move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A unit of asynchronous work delegated to an external provider.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Principal that submitted the job; never changes
    pub owner_id: String,

    /// What kind of external work this is
    pub kind: JobKind,

    /// Provider-assigned identifier, set once submission succeeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,

    /// Current state machine position
    #[serde(default)]
    pub status: JobStatus,

    /// Kind-specific request payload, kept for audit/replay
    pub params: serde_json::Value,

    /// Provider result, populated only when status is `completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Failure reason, populated only when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Bumped on every status transition
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job owned by `owner_id`.
    pub fn new(owner_id: impl Into<String>, kind: JobKind, params: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            owner_id: owner_id.into(),
            kind,
            external_ref: None,
            status: JobStatus::Pending,
            params,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a successful provider submission.
    pub fn mark_submitted(&mut self, external_ref: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Submitted)?;
        self.external_ref = Some(external_ref.into());
        Ok(())
    }

    /// Record a non-terminal poll response.
    pub fn mark_processing(&mut self) -> Result<(), TransitionError> {
        // Redundant progress reports are a no-op, not an error; providers may
        // deliver the same non-terminal status many times.
        if self.status == JobStatus::Processing {
            return Ok(());
        }
        self.transition(JobStatus::Processing)
    }

    /// Record successful completion with the provider's result payload.
    pub fn mark_completed(&mut self, result: serde_json::Value) -> Result<(), TransitionError> {
        if self.is_same_terminal(JobStatus::Completed, Some(&result), None) {
            return Ok(());
        }
        self.transition(JobStatus::Completed)?;
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    /// Record failure with a descriptive error.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        let error = error.into();
        if self.is_same_terminal(JobStatus::Failed, None, Some(&error)) {
            return Ok(());
        }
        self.transition(JobStatus::Failed)?;
        self.error = Some(error);
        self.result = None;
        Ok(())
    }

    /// True when a terminal write would re-deliver the outcome already held.
    /// Duplicate poll deliveries must be tolerated without touching
    /// `updated_at` again.
    fn is_same_terminal(
        &self,
        status: JobStatus,
        result: Option<&serde_json::Value>,
        error: Option<&str>,
    ) -> bool {
        self.status == status
            && self.result.as_ref() == result
            && self.error.as_deref() == error
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Compact job view returned by listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobSummary {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            kind: job.kind,
            status: job.status,
            error: job.error.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}
