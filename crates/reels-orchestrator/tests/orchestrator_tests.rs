//! End-to-end orchestrator scenarios against the in-memory store and a
//! scripted provider adapter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use reels_models::{DubbingParams, JobKind, JobParams, JobStatus, VideoAnalysisParams};
use reels_orchestrator::{JobArtifact, JobOrchestrator, OrchestratorError, PollPolicy};
use reels_providers::{
    Artifact, PollOutcome, ProviderAdapter, ProviderError, ProviderResult, Submission,
};
use reels_store::{JobStore, MemoryJobStore};

/// Adapter whose submit and poll responses are scripted up front.
struct FakeAdapter {
    kind: JobKind,
    submit_response: Mutex<Option<ProviderResult<Submission>>>,
    poll_script: Mutex<VecDeque<ProviderResult<PollOutcome>>>,
    /// Returned once the script runs dry.
    poll_fallback: PollOutcome,
    poll_calls: AtomicU32,
    artifact: Mutex<Option<ProviderResult<Artifact>>>,
}

impl FakeAdapter {
    fn new(kind: JobKind, submit: ProviderResult<Submission>) -> Self {
        Self {
            kind,
            submit_response: Mutex::new(Some(submit)),
            poll_script: Mutex::new(VecDeque::new()),
            poll_fallback: PollOutcome::InProgress,
            poll_calls: AtomicU32::new(0),
            artifact: Mutex::new(None),
        }
    }

    fn with_polls(self, script: Vec<ProviderResult<PollOutcome>>) -> Self {
        *self.poll_script.lock().unwrap() = script.into();
        self
    }

    fn with_artifact(self, artifact: ProviderResult<Artifact>) -> Self {
        *self.artifact.lock().unwrap() = Some(artifact);
        self
    }

    fn poll_count(&self) -> u32 {
        self.poll_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn submit(&self, _params: &JobParams) -> ProviderResult<Submission> {
        self.submit_response
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Submission::deferred("ref_again")))
    }

    async fn poll(&self, _external_ref: &str) -> ProviderResult<PollOutcome> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.poll_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.poll_fallback.clone()))
    }

    async fn fetch_artifact(&self, _external_ref: &str) -> ProviderResult<Artifact> {
        match self.artifact.lock().unwrap().take() {
            Some(a) => a,
            None => Err(ProviderError::NotReady),
        }
    }
}

fn fast_policy(max_polls: u32) -> PollPolicy {
    PollPolicy {
        poll_interval: Duration::from_millis(1),
        max_poll_attempts: max_polls,
        transient_retries: 0,
        retry_base_delay: Duration::from_millis(1),
    }
}

fn dubbing_params() -> JobParams {
    JobParams::Dubbing(DubbingParams {
        source_url: "https://cdn.example.com/reel.mp4".to_string(),
        source_lang: Some("ru".to_string()),
        target_lang: "en".to_string(),
        num_speakers: Some(1),
        watermark: false,
    })
}

fn analysis_params() -> JobParams {
    JobParams::VideoAnalysis(VideoAnalysisParams {
        transcript: "Сегодня расскажу, как снимать хуки".to_string(),
        language: "ru".to_string(),
        video_url: None,
    })
}

fn setup(
    adapter: FakeAdapter,
    policy: PollPolicy,
) -> (Arc<JobOrchestrator>, Arc<MemoryJobStore>, Arc<FakeAdapter>) {
    let store = Arc::new(MemoryJobStore::new());
    let adapter = Arc::new(adapter);
    let orchestrator = Arc::new(
        JobOrchestrator::new(store.clone(), policy).register(adapter.clone()),
    );
    (orchestrator, store, adapter)
}

#[tokio::test]
async fn test_happy_path_dubbing() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_123")))
        .with_polls(vec![
            Ok(PollOutcome::InProgress),
            Ok(PollOutcome::InProgress),
            Ok(PollOutcome::Completed(json!({"dubbing_id": "dub_123"}))),
        ]);
    let (orchestrator, _store, adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    assert_eq!(job.status, JobStatus::Submitted);
    assert_eq!(job.external_ref.as_deref(), Some("dub_123"));

    // Wait for the background poller to reach a terminal state.
    let job = wait_terminal(&orchestrator, &job.id, "user1").await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result, Some(json!({"dubbing_id": "dub_123"})));
    assert!(job.error.is_none());
    assert_eq!(adapter.poll_count(), 3);
}

#[tokio::test]
async fn test_submit_failure_leaves_failed_record() {
    let adapter = FakeAdapter::new(
        JobKind::Dubbing,
        Err(ProviderError::unavailable("connect refused")),
    );
    let (orchestrator, _store, adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.external_ref.is_none());
    assert!(job.error.as_deref().unwrap().contains("ProviderUnavailable"));
    assert!(job.result.is_none());
    // No polling for a job that never got an external ref.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(adapter.poll_count(), 0);
}

#[tokio::test]
async fn test_validation_failure_creates_nothing() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_123")));
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(10));

    let bad = JobParams::Dubbing(DubbingParams {
        source_url: "not-a-url".to_string(),
        source_lang: None,
        target_lang: "en".to_string(),
        num_speakers: None,
        watermark: false,
    });
    let err = orchestrator.submit("user1", bad).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidInput(_)));
    assert!(orchestrator.list("user1", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_budget_exhaustion_fails_job() {
    // Fallback keeps returning InProgress; the budget runs out at 4.
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_slow")));
    let (orchestrator, _store, adapter) = setup(adapter, fast_policy(4));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    let job = wait_terminal(&orchestrator, &job.id, "user1").await;

    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.unwrap();
    assert!(error.contains("PollTimeout"), "got: {error}");
    assert!(error.contains("still be running"), "got: {error}");
    assert_eq!(adapter.poll_count(), 4);

    // Nothing keeps polling after the terminal write.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(adapter.poll_count(), 4);
}

#[tokio::test]
async fn test_provider_reported_failure_preserved() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_bad")))
        .with_polls(vec![
            Ok(PollOutcome::InProgress),
            Ok(PollOutcome::Failed("audio track unreadable".to_string())),
        ]);
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    let job = wait_terminal(&orchestrator, &job.id, "user1").await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("audio track unreadable"));
    assert_eq!(job.external_ref.as_deref(), Some("dub_bad"));
}

#[tokio::test]
async fn test_transient_poll_errors_fail_after_retry_budget() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_flaky")))
        .with_polls(vec![
            Err(ProviderError::unavailable("502 from upstream")),
        ]);
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    let job = wait_terminal(&orchestrator, &job.id, "user1").await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("ProviderUnavailable"));
}

#[tokio::test]
async fn test_analysis_completes_within_submit() {
    let report = json!({"summary": "ok", "wpm": 150});
    let adapter = FakeAdapter::new(
        JobKind::VideoAnalysis,
        Ok(Submission::immediate("analysis_1", report.clone())),
    );
    let (orchestrator, _store, adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("user1", analysis_params()).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result, Some(report.clone()));

    // Immediate completion never schedules polling.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(adapter.poll_count(), 0);

    // And the inline artifact comes straight off the record.
    match orchestrator.fetch_artifact(&job.id, "user1").await.unwrap() {
        JobArtifact::Inline(value) => assert_eq!(value, report),
        other => panic!("expected inline artifact, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_kind_is_rejected() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_1")));
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(10));

    let err = orchestrator
        .submit("user1", analysis_params())
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::UnsupportedKind(JobKind::VideoAnalysis)));
}

#[tokio::test]
async fn test_status_masks_other_owners() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_1")));
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("alice", dubbing_params()).await.unwrap();

    // The owner sees it; anyone else gets the same answer as for a job
    // that does not exist.
    assert!(orchestrator.status(&job.id, "alice").await.is_ok());
    let err = orchestrator.status(&job.id, "bob").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound(_)));

    let err = orchestrator.fetch_artifact(&job.id, "bob").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound(_)));
}

#[tokio::test]
async fn test_artifact_not_ready_before_completion() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_1")));
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(1000));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    let err = orchestrator.fetch_artifact(&job.id, "user1").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotReady));
}

#[tokio::test]
async fn test_artifact_url_for_completed_avatar_video() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_1")))
        .with_polls(vec![Ok(PollOutcome::Completed(json!({"ok": true})))])
        .with_artifact(Ok(Artifact::Url(
            "https://provider.example.com/output.mp4".to_string(),
        )));
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(10));

    let job = orchestrator.submit("user1", dubbing_params()).await.unwrap();
    let job = wait_terminal(&orchestrator, &job.id, "user1").await;
    assert_eq!(job.status, JobStatus::Completed);

    match orchestrator.fetch_artifact(&job.id, "user1").await.unwrap() {
        JobArtifact::Url(url) => assert_eq!(url, "https://provider.example.com/output.mp4"),
        other => panic!("expected url artifact, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resume_restarts_polling_for_submitted_jobs() {
    // A job left submitted by a previous process, written straight into the
    // store without going through submit().
    let store = Arc::new(MemoryJobStore::new());
    let created = store
        .create("user1", JobKind::Dubbing, json!({"target_lang": "en"}))
        .await
        .unwrap();
    store.record_submitted(&created.id, "dub_orphan").await.unwrap();

    let adapter = Arc::new(
        FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("unused")))
            .with_polls(vec![Ok(PollOutcome::Completed(json!({"ok": true})))]),
    );
    let orchestrator = Arc::new(
        JobOrchestrator::new(store.clone(), fast_policy(10)).register(adapter.clone()),
    );

    let resumed = orchestrator.resume_owner_jobs("user1").await.unwrap();
    assert_eq!(resumed, 1);

    let job = wait_terminal(&orchestrator, &created.id, "user1").await;
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn test_resume_fails_jobs_interrupted_before_submission() {
    let store = Arc::new(MemoryJobStore::new());
    let created = store
        .create("user1", JobKind::Dubbing, json!({"target_lang": "en"}))
        .await
        .unwrap();

    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("unused")));
    let (orchestrator, _, _) = {
        let adapter = Arc::new(adapter);
        let o = Arc::new(
            JobOrchestrator::new(store.clone(), fast_policy(10)).register(adapter.clone()),
        );
        (o, store.clone(), adapter)
    };

    let resumed = orchestrator.resume_owner_jobs("user1").await.unwrap();
    assert_eq!(resumed, 0);

    let job = orchestrator.status(&created.id, "user1").await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("interrupted"));
}

#[tokio::test]
async fn test_delete_is_owner_scoped() {
    let adapter = FakeAdapter::new(JobKind::Dubbing, Ok(Submission::deferred("dub_1")));
    let (orchestrator, _store, _adapter) = setup(adapter, fast_policy(1000));

    let job = orchestrator.submit("alice", dubbing_params()).await.unwrap();

    let err = orchestrator.delete("bob", &job.id).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound(_)));

    orchestrator.delete("alice", &job.id).await.unwrap();
    assert!(orchestrator.status(&job.id, "alice").await.is_err());
}

/// Poll the read side until the job reaches a terminal state.
async fn wait_terminal(
    orchestrator: &Arc<JobOrchestrator>,
    id: &reels_models::JobId,
    owner: &str,
) -> reels_models::Job {
    for _ in 0..500 {
        let job = orchestrator.status(id, owner).await.unwrap();
        if job.status.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job never reached a terminal state");
}
