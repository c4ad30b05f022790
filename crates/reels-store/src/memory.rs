//! In-memory store backend for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use reels_models::{Job, JobId, JobKind};

use crate::error::{StoreError, StoreResult};
use crate::store::{apply_terminal, JobStore, TerminalOutcome};

/// HashMap-backed store. Transitions go through the same guard as the Redis
/// backend, so contract tests written against this type hold for both.
#[derive(Default, Clone)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mutate<F>(&self, id: &JobId, f: F) -> StoreResult<Job>
    where
        F: FnOnce(&mut Job) -> Result<(), reels_models::TransitionError>,
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        f(job)?;
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(
        &self,
        owner_id: &str,
        kind: JobKind,
        params: serde_json::Value,
    ) -> StoreResult<Job> {
        let job = Job::new(owner_id, kind, params);
        self.jobs
            .write()
            .await
            .insert(job.id.as_str().to_string(), job.clone());
        Ok(job)
    }

    async fn record_submitted(&self, id: &JobId, external_ref: &str) -> StoreResult<Job> {
        self.mutate(id, |job| job.mark_submitted(external_ref)).await
    }

    async fn record_progress(&self, id: &JobId) -> StoreResult<Job> {
        self.mutate(id, |job| job.mark_processing()).await
    }

    async fn record_terminal(&self, id: &JobId, outcome: TerminalOutcome) -> StoreResult<Job> {
        self.mutate(id, |job| apply_terminal(job, &outcome)).await
    }

    async fn get(&self, id: &JobId) -> StoreResult<Job> {
        self.jobs
            .read()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::not_found(id.as_str()))
    }

    async fn list_by_owner(&self, owner_id: &str, kind: Option<JobKind>) -> StoreResult<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut owned: Vec<Job> = jobs
            .values()
            .filter(|j| j.owner_id == owner_id)
            .filter(|j| kind.map_or(true, |k| j.kind == k))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn delete(&self, owner_id: &str, id: &JobId) -> StoreResult<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get(id.as_str()) {
            Some(job) if job.owner_id == owner_id => {
                jobs.remove(id.as_str());
                Ok(())
            }
            // Non-owners learn nothing about the job's existence.
            _ => Err(StoreError::not_found(id.as_str())),
        }
    }
}
