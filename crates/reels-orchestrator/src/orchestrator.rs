//! The job orchestrator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use metrics::counter;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use reels_models::{Job, JobId, JobKind, JobParams};
use reels_providers::{Artifact, PollOutcome, ProviderAdapter};
use reels_store::{JobStore, StoreError, TerminalOutcome};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::policy::PollPolicy;
use crate::retry::retry_transient;

/// A completed job's output, as served to the owner.
#[derive(Debug, Clone)]
pub enum JobArtifact {
    /// Result stored inline on the job record (transcript analysis)
    Inline(serde_json::Value),
    /// Media bytes fetched from the provider
    Media { content_type: String, data: Vec<u8> },
    /// Provider-hosted URL
    Url(String),
}

/// Owns the job state machine, independent of which provider backs a kind.
///
/// All writes go through the store's transition methods; nothing here keeps
/// job state in memory, so status queries always reflect the last durable
/// transition.
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    adapters: HashMap<JobKind, Arc<dyn ProviderAdapter>>,
    policy: PollPolicy,
    // Job ids with an active poll task; prevents duplicate pollers.
    in_flight: Mutex<HashSet<String>>,
}

impl JobOrchestrator {
    pub fn new(store: Arc<dyn JobStore>, policy: PollPolicy) -> Self {
        Self {
            store,
            adapters: HashMap::new(),
            policy,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Register a provider adapter for its kind.
    pub fn register(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    fn adapter_for(&self, kind: JobKind) -> OrchestratorResult<Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(&kind)
            .cloned()
            .ok_or(OrchestratorError::UnsupportedKind(kind))
    }

    /// Submit new work.
    ///
    /// Validation happens before any record or external call; a validation
    /// failure is the caller's error and creates nothing. A submit that
    /// reaches the provider and fails leaves a failed job record behind so
    /// the caller can inspect what happened.
    pub async fn submit(self: &Arc<Self>, owner_id: &str, params: JobParams) -> OrchestratorResult<Job> {
        params
            .validate()
            .map_err(|e| OrchestratorError::InvalidInput(e.to_string()))?;

        let kind = params.kind();
        let adapter = self.adapter_for(kind)?;

        let job = self
            .store
            .create(owner_id, kind, params.to_stored())
            .await?;
        info!(job_id = %job.id, owner_id, kind = %kind, "Submitting job");

        let submission = retry_transient(
            self.policy.transient_retries,
            self.policy.retry_base_delay,
            "provider_submit",
            || adapter.submit(&params),
        )
        .await;

        let submission = match submission {
            Ok(s) => s,
            Err(e) => {
                // Submit never produced an external ref: pending -> failed.
                warn!(job_id = %job.id, "Submit failed: {}", e);
                counter!("reels_jobs_failed_total", "kind" => kind.as_str(), "stage" => "submit")
                    .increment(1);
                let failed = self
                    .store
                    .record_terminal(&job.id, TerminalOutcome::Failed(e.to_string()))
                    .await?;
                return Ok(failed);
            }
        };

        let job = self
            .store
            .record_submitted(&job.id, &submission.external_ref)
            .await?;

        if let Some(result) = submission.immediate_result {
            // No async phase on the provider side; complete right away.
            let job = self
                .store
                .record_terminal(&job.id, TerminalOutcome::Completed(result))
                .await?;
            counter!("reels_jobs_completed_total", "kind" => kind.as_str()).increment(1);
            return Ok(job);
        }

        self.schedule_polling(&job);
        Ok(job)
    }

    /// Spawn the background poll task for a submitted job. A job with a
    /// poller already running is left alone.
    fn schedule_polling(self: &Arc<Self>, job: &Job) {
        let orchestrator = Arc::clone(self);
        let job_id = job.id.clone();
        let kind = job.kind;
        let external_ref = match &job.external_ref {
            Some(r) => r.clone(),
            None => return,
        };

        tokio::spawn(async move {
            orchestrator.run_polling(&job_id, kind, &external_ref).await;
        });
    }

    /// Poll the provider at the policy's cadence until a terminal state or
    /// the attempt budget runs out, recording each transition durably.
    ///
    /// Public so tests (and a recovery path reloading submitted jobs after a
    /// restart) can drive it directly and await its completion.
    pub async fn run_polling(&self, job_id: &JobId, kind: JobKind, external_ref: &str) {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(job_id.as_str().to_string()) {
                // Another poller owns this job.
                return;
            }
        }

        let outcome = self.poll_until_terminal(job_id, kind, external_ref).await;
        if let Err(e) = outcome {
            // Store write failed mid-poll; the job will be picked up as stuck
            // by the operator. Nothing more to do from here.
            error!(job_id = %job_id, "Polling aborted on store error: {}", e);
        }

        self.in_flight.lock().await.remove(job_id.as_str());
    }

    async fn poll_until_terminal(
        &self,
        job_id: &JobId,
        kind: JobKind,
        external_ref: &str,
    ) -> OrchestratorResult<()> {
        let adapter = self.adapter_for(kind)?;

        for attempt in 1..=self.policy.max_poll_attempts {
            tokio::time::sleep(self.policy.poll_interval).await;

            let polled = retry_transient(
                self.policy.transient_retries,
                self.policy.retry_base_delay,
                "provider_poll",
                || adapter.poll(external_ref),
            )
            .await;

            match polled {
                Ok(PollOutcome::InProgress) => {
                    self.store.record_progress(job_id).await?;
                }
                Ok(PollOutcome::Completed(result)) => {
                    info!(job_id = %job_id, attempt, "Job completed");
                    counter!("reels_jobs_completed_total", "kind" => kind.as_str()).increment(1);
                    self.store
                        .record_terminal(job_id, TerminalOutcome::Completed(result))
                        .await?;
                    return Ok(());
                }
                Ok(PollOutcome::Failed(detail)) => {
                    warn!(job_id = %job_id, attempt, "Provider reported failure: {}", detail);
                    counter!("reels_jobs_failed_total", "kind" => kind.as_str(), "stage" => "poll")
                        .increment(1);
                    self.store
                        .record_terminal(
                            job_id,
                            TerminalOutcome::Failed(format!("provider failure: {}", detail)),
                        )
                        .await?;
                    return Ok(());
                }
                Err(e) => {
                    // Transient retries inside retry_transient are exhausted;
                    // the provider is unreachable, which is not the job failing
                    // on its own but still ends the attempt budget for us.
                    warn!(job_id = %job_id, attempt, "Poll failed: {}", e);
                    counter!("reels_jobs_failed_total", "kind" => kind.as_str(), "stage" => "poll")
                        .increment(1);
                    self.store
                        .record_terminal(job_id, TerminalOutcome::Failed(e.to_string()))
                        .await?;
                    return Ok(());
                }
            }
        }

        // Budget exhausted without a terminal provider response.
        warn!(job_id = %job_id, attempts = self.policy.max_poll_attempts, "Poll budget exhausted");
        counter!("reels_jobs_failed_total", "kind" => kind.as_str(), "stage" => "timeout")
            .increment(1);
        self.store
            .record_terminal(
                job_id,
                TerminalOutcome::Failed(format!(
                    "PollTimeout: no terminal status after {} polls; the provider-side job may still be running",
                    self.policy.max_poll_attempts
                )),
            )
            .await?;
        Ok(())
    }

    /// Latest durably-recorded state of a job, for its owner only.
    ///
    /// Never triggers a provider call; this is the read side the status
    /// endpoint polls cheaply. Non-owners get the same answer as for a job
    /// that does not exist.
    pub async fn status(&self, job_id: &JobId, requester_id: &str) -> OrchestratorResult<Job> {
        let job = self.store.get(job_id).await?;
        if job.owner_id != requester_id {
            return Err(OrchestratorError::NotFound(job_id.as_str().to_string()));
        }
        Ok(job)
    }

    /// The requester's jobs, newest first.
    pub async fn list(
        &self,
        owner_id: &str,
        kind: Option<JobKind>,
    ) -> OrchestratorResult<Vec<Job>> {
        Ok(self.store.list_by_owner(owner_id, kind).await?)
    }

    /// Remove a job from the owner's history.
    pub async fn delete(&self, owner_id: &str, job_id: &JobId) -> OrchestratorResult<()> {
        Ok(self.store.delete(owner_id, job_id).await?)
    }

    /// Fetch the completed output of an owned job.
    pub async fn fetch_artifact(
        &self,
        job_id: &JobId,
        requester_id: &str,
    ) -> OrchestratorResult<JobArtifact> {
        let job = self.status(job_id, requester_id).await?;
        if !job.status.is_terminal() || job.result.is_none() {
            return Err(OrchestratorError::NotReady);
        }

        // Analysis results live inline on the record.
        if job.kind == JobKind::VideoAnalysis {
            return Ok(JobArtifact::Inline(job.result.unwrap_or_default()));
        }

        let adapter = self.adapter_for(job.kind)?;
        let external_ref = job
            .external_ref
            .ok_or_else(|| OrchestratorError::NotFound(job_id.as_str().to_string()))?;

        let artifact = retry_transient(
            self.policy.transient_retries,
            self.policy.retry_base_delay,
            "provider_fetch_artifact",
            || adapter.fetch_artifact(&external_ref),
        )
        .await?;

        Ok(match artifact {
            Artifact::Bytes { content_type, data } => JobArtifact::Media { content_type, data },
            Artifact::Url(url) => JobArtifact::Url(url),
        })
    }

    /// Resume polling for jobs left non-terminal by a previous process
    /// (restart recovery). Jobs without an external ref cannot be resumed
    /// and are failed outright.
    pub async fn resume_owner_jobs(self: &Arc<Self>, owner_id: &str) -> OrchestratorResult<u32> {
        let jobs = self.store.list_by_owner(owner_id, None).await?;
        let mut resumed = 0u32;
        for job in jobs {
            if job.status.is_terminal() {
                continue;
            }
            match &job.external_ref {
                Some(_) => {
                    self.schedule_polling(&job);
                    resumed += 1;
                }
                None => {
                    self.store
                        .record_terminal(
                            &job.id,
                            TerminalOutcome::Failed(
                                "interrupted before submission completed".to_string(),
                            ),
                        )
                        .await
                        .map_err(OrchestratorError::from)
                        .map(|_| ())
                        .or_else(|e| match e {
                            // Raced with a concurrent terminal write; fine.
                            OrchestratorError::Store(StoreError::InvalidTransition(_)) => Ok(()),
                            other => Err(other),
                        })?;
                }
            }
        }
        Ok(resumed)
    }
}
