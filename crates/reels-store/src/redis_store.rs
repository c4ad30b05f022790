//! Redis-backed job store.
//!
//! Layout:
//! - `{prefix}:job:{id}` — job record JSON
//! - `{prefix}:owner:{owner_id}:jobs` — zset of the owner's job ids scored by
//!   creation time (millis), which gives newest-first listing for free
//!
//! Writers for a single job are serialized through a per-job async mutex so a
//! read-modify-write never interleaves with another transition for the same
//! id. Cross-job ordering is not guaranteed and not needed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::{debug, info};

use reels_models::{Job, JobId, JobKind};

use crate::error::{StoreError, StoreResult};
use crate::store::{apply_terminal, JobStore, TerminalOutcome};

/// Redis store configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Key namespace prefix
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "reels".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("STORE_KEY_PREFIX").unwrap_or_else(|_| "reels".to_string()),
        }
    }
}

/// Redis-backed job store.
pub struct RedisJobStore {
    client: redis::Client,
    config: RedisStoreConfig,
    // Serializes transitions per job id.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RedisJobStore {
    /// Create a new store.
    pub fn new(config: RedisStoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self {
            client,
            config,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(RedisStoreConfig::from_env())
    }

    fn job_key(&self, id: &JobId) -> String {
        format!("{}:job:{}", self.config.key_prefix, id)
    }

    fn owner_index_key(&self, owner_id: &str) -> String {
        format!("{}:owner:{}:jobs", self.config.key_prefix, owner_id)
    }

    async fn lock_for(&self, id: &JobId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(id.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn release_lock(&self, id: &JobId) {
        self.locks.lock().await.remove(id.as_str());
    }

    async fn load(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        id: &JobId,
    ) -> StoreResult<Job> {
        let raw: Option<String> = conn.get(self.job_key(id)).await?;
        let raw = raw.ok_or_else(|| StoreError::not_found(id.as_str()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        job: &Job,
    ) -> StoreResult<()> {
        let payload = serde_json::to_string(job)?;
        conn.set::<_, _, ()>(self.job_key(&job.id), payload).await?;
        Ok(())
    }

    /// Run a guarded read-modify-write transition.
    async fn mutate<F>(&self, id: &JobId, f: F) -> StoreResult<Job>
    where
        F: FnOnce(&mut Job) -> Result<(), reels_models::TransitionError>,
    {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut job = self.load(&mut conn, id).await?;
        f(&mut job)?;
        self.save(&mut conn, &job).await?;

        counter!("reels_job_transitions_total", "status" => job.status.as_str()).increment(1);
        debug!(job_id = %job.id, status = %job.status, "Recorded job transition");
        Ok(job)
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(
        &self,
        owner_id: &str,
        kind: JobKind,
        params: serde_json::Value,
    ) -> StoreResult<Job> {
        let job = Job::new(owner_id, kind, params);

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.save(&mut conn, &job).await?;
        conn.zadd::<_, _, _, ()>(
            self.owner_index_key(owner_id),
            job.id.as_str(),
            job.created_at.timestamp_millis(),
        )
        .await?;

        info!(job_id = %job.id, owner_id, kind = %kind, "Created job record");
        counter!("reels_jobs_created_total", "kind" => kind.as_str()).increment(1);
        Ok(job)
    }

    async fn record_submitted(&self, id: &JobId, external_ref: &str) -> StoreResult<Job> {
        self.mutate(id, |job| job.mark_submitted(external_ref)).await
    }

    async fn record_progress(&self, id: &JobId) -> StoreResult<Job> {
        self.mutate(id, |job| job.mark_processing()).await
    }

    async fn record_terminal(&self, id: &JobId, outcome: TerminalOutcome) -> StoreResult<Job> {
        let job = self.mutate(id, |job| apply_terminal(job, &outcome)).await?;
        // Terminal jobs take no further transitions; drop the lock entry.
        self.release_lock(id).await;
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> StoreResult<Job> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.load(&mut conn, id).await
    }

    async fn list_by_owner(&self, owner_id: &str, kind: Option<JobKind>) -> StoreResult<Vec<Job>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Newest first via reverse score order.
        let ids: Vec<String> = conn
            .zrevrange(self.owner_index_key(owner_id), 0, -1)
            .await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let job_id = JobId::from(id);
            match self.load(&mut conn, &job_id).await {
                Ok(job) => {
                    if kind.map_or(true, |k| job.kind == k) {
                        jobs.push(job);
                    }
                }
                // Index entry survived its record (expired/cleaned); skip it.
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(jobs)
    }

    async fn delete(&self, owner_id: &str, id: &JobId) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let job = self.load(&mut conn, id).await?;
        if job.owner_id != owner_id {
            // Do not reveal existence to non-owners.
            return Err(StoreError::not_found(id.as_str()));
        }

        conn.del::<_, ()>(self.job_key(id)).await?;
        conn.zrem::<_, _, ()>(self.owner_index_key(owner_id), id.as_str())
            .await?;
        self.release_lock(id).await;

        info!(job_id = %id, owner_id, "Deleted job record");
        Ok(())
    }
}
