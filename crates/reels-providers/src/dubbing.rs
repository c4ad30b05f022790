//! ElevenLabs dubbing adapter.
//!
//! Submit uploads the source URL to `POST /v1/dubbing` and gets back a
//! dubbing id; poll reads `GET /v1/dubbing/{id}` and maps the provider's
//! `dubbing | dubbed | failed` states onto the generic vocabulary; the
//! artifact is the dubbed audio from `GET /v1/dubbing/{id}/audio/{lang}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use reels_models::{JobKind, JobParams};

use crate::adapter::{Artifact, PollOutcome, ProviderAdapter, Submission};
use crate::error::{error_from_response, ProviderError, ProviderResult};

const API_KEY_HEADER: &str = "xi-api-key";

/// Dubbing provider configuration.
#[derive(Debug, Clone)]
pub struct DubbingConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl DubbingConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("ELEVENLABS_API_KEY")
            .map_err(|_| ProviderError::unavailable("ELEVENLABS_API_KEY not set"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("ELEVENLABS_BASE_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string()),
            request_timeout: Duration::from_secs(30),
        })
    }
}

/// ElevenLabs dubbing client.
pub struct DubbingProvider {
    client: Client,
    config: DubbingConfig,
}

#[derive(Debug, Deserialize)]
struct DubbingSubmitResponse {
    dubbing_id: String,
    #[serde(default)]
    expected_duration_sec: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DubbingStatusResponse {
    status: String,
    #[serde(default)]
    target_languages: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

impl DubbingProvider {
    pub fn new(config: DubbingConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(DubbingConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn status(&self, dubbing_id: &str) -> ProviderResult<DubbingStatusResponse> {
        let response = self
            .client
            .get(self.url(&format!("/v1/dubbing/{}", dubbing_id)))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("ElevenLabs", response).await);
        }

        response
            .json::<DubbingStatusResponse>()
            .await
            .map_err(|e| ProviderError::unavailable(format!("bad dubbing status payload: {}", e)))
    }
}

#[async_trait]
impl ProviderAdapter for DubbingProvider {
    fn kind(&self) -> JobKind {
        JobKind::Dubbing
    }

    async fn submit(&self, params: &JobParams) -> ProviderResult<Submission> {
        let JobParams::Dubbing(params) = params else {
            return Err(ProviderError::invalid_input("expected dubbing params"));
        };

        let mut form = Form::new()
            .text("source_url", params.source_url.clone())
            .text("target_lang", params.target_lang.clone())
            .text("watermark", params.watermark.to_string());
        if let Some(lang) = &params.source_lang {
            form = form.text("source_lang", lang.clone());
        }
        if let Some(n) = params.num_speakers {
            form = form.text("num_speakers", n.to_string());
        }

        let response = self
            .client
            .post(self.url("/v1/dubbing"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("ElevenLabs", response).await);
        }

        let body: DubbingSubmitResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(format!("bad dubbing submit payload: {}", e)))?;

        info!(
            dubbing_id = %body.dubbing_id,
            expected_duration_sec = ?body.expected_duration_sec,
            "Started dubbing"
        );
        Ok(Submission::deferred(body.dubbing_id))
    }

    async fn poll(&self, external_ref: &str) -> ProviderResult<PollOutcome> {
        let status = self.status(external_ref).await?;
        debug!(dubbing_id = external_ref, status = %status.status, "Polled dubbing");

        match status.status.as_str() {
            "dubbing" => Ok(PollOutcome::InProgress),
            "dubbed" => Ok(PollOutcome::Completed(json!({
                "dubbing_id": external_ref,
                "target_languages": status.target_languages,
            }))),
            "failed" => Ok(PollOutcome::Failed(
                status
                    .error
                    .unwrap_or_else(|| "dubbing failed without detail".to_string()),
            )),
            other => Err(ProviderError::unavailable(format!(
                "unknown dubbing status: {}",
                other
            ))),
        }
    }

    async fn fetch_artifact(&self, external_ref: &str) -> ProviderResult<Artifact> {
        let status = self.status(external_ref).await?;
        if status.status != "dubbed" {
            return Err(ProviderError::NotReady);
        }
        let lang = status
            .target_languages
            .first()
            .ok_or_else(|| ProviderError::unavailable("dubbed job reports no target language"))?;

        let response = self
            .client
            .get(self.url(&format!("/v1/dubbing/{}/audio/{}", external_ref, lang)))
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("ElevenLabs", response).await);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/mpeg")
            .to_string();
        let data = response.bytes().await?.to_vec();

        Ok(Artifact::Bytes { content_type, data })
    }
}
