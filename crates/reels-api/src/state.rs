//! Application state.

use std::sync::Arc;

use reels_orchestrator::{JobOrchestrator, PollPolicy};
use reels_providers::{AnalysisProvider, AvatarProvider, DubbingProvider};
use reels_store::{JobStore, RedisJobStore};

use crate::auth::TokenVerifier;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Create application state from the environment: Redis-backed store,
    /// one adapter per provider, and the poll policy.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store: Arc<dyn JobStore> = Arc::new(RedisJobStore::from_env()?);

        let orchestrator = JobOrchestrator::new(Arc::clone(&store), PollPolicy::from_env())
            .register(Arc::new(AnalysisProvider::from_env()?))
            .register(Arc::new(DubbingProvider::from_env()?))
            .register(Arc::new(AvatarProvider::from_env()?));

        let verifier = TokenVerifier::from_env()?;

        Ok(Self {
            config,
            store,
            orchestrator: Arc::new(orchestrator),
            verifier: Arc::new(verifier),
        })
    }

    /// Build state around an existing store and orchestrator. Used by tests.
    pub fn with_parts(
        config: ApiConfig,
        store: Arc<dyn JobStore>,
        orchestrator: Arc<JobOrchestrator>,
        verifier: TokenVerifier,
    ) -> Self {
        Self {
            config,
            store,
            orchestrator,
            verifier: Arc::new(verifier),
        }
    }
}
