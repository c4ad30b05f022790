//! HeyGen avatar video adapter.
//!
//! Submit calls `POST /v2/video/generate` and gets back a video id; poll
//! reads `GET /v1/video_status.get?video_id=` and maps the provider's
//! `pending | waiting | processing | completed | failed` states; the artifact
//! is the hosted video URL from the completed status payload.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use reels_models::{AvatarVideoParams, JobKind, JobParams};

use crate::adapter::{Artifact, PollOutcome, ProviderAdapter, Submission};
use crate::error::{error_from_response, ProviderError, ProviderResult};

const API_KEY_HEADER: &str = "X-Api-Key";

/// Avatar provider configuration.
#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
    /// Generate watermarked test videos that do not consume quota
    pub test_mode: bool,
}

impl AvatarConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("HEYGEN_API_KEY")
            .map_err(|_| ProviderError::unavailable("HEYGEN_API_KEY not set"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("HEYGEN_BASE_URL")
                .unwrap_or_else(|_| "https://api.heygen.com".to_string()),
            request_timeout: Duration::from_secs(30),
            test_mode: std::env::var("HEYGEN_TEST_MODE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// HeyGen avatar video client.
pub struct AvatarProvider {
    client: Client,
    config: AvatarConfig,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    video_inputs: Vec<serde_json::Value>,
    aspect_ratio: String,
    test: bool,
}

// HeyGen wraps every payload in {error, data}.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoStatusData {
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

impl AvatarProvider {
    pub fn new(config: AvatarConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(AvatarConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn build_video_input(params: &AvatarVideoParams) -> serde_json::Value {
        let character = match (&params.avatar_id, &params.talking_photo_id) {
            (_, Some(photo_id)) => json!({
                "type": "talking_photo",
                "talking_photo_id": photo_id,
                "talking_style": "expressive",
            }),
            (avatar_id, None) => json!({
                "type": "avatar",
                "avatar_id": avatar_id.as_deref().unwrap_or("Daisy-inskirt-20220818"),
                "avatar_style": "normal",
                "talking_style": "expressive",
            }),
        };

        json!({
            "character": character,
            "voice": {
                "type": "text",
                "input_text": params.script,
                "voice_id": params.voice_id,
                "speed": 1.0,
            },
            "background": {
                "type": "color",
                "value": params.background_color,
            },
        })
    }

    async fn status(&self, video_id: &str) -> ProviderResult<VideoStatusData> {
        let response = self
            .client
            .get(self.url("/v1/video_status.get"))
            .query(&[("video_id", video_id)])
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("HeyGen", response).await);
        }

        let envelope: Envelope<VideoStatusData> = response
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(format!("bad video status payload: {}", e)))?;

        if let Some(error) = envelope.error {
            return Err(ProviderError::unavailable(format!("HeyGen error: {}", error)));
        }
        envelope
            .data
            .ok_or_else(|| ProviderError::unavailable("video status payload missing data"))
    }
}

#[async_trait]
impl ProviderAdapter for AvatarProvider {
    fn kind(&self) -> JobKind {
        JobKind::AvatarVideo
    }

    async fn submit(&self, params: &JobParams) -> ProviderResult<Submission> {
        let JobParams::AvatarVideo(params) = params else {
            return Err(ProviderError::invalid_input("expected avatar video params"));
        };

        let request = GenerateRequest {
            video_inputs: vec![Self::build_video_input(params)],
            aspect_ratio: params.aspect_ratio.as_str().to_string(),
            test: self.config.test_mode,
        };

        let response = self
            .client
            .post(self.url("/v2/video/generate"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("HeyGen", response).await);
        }

        let envelope: Envelope<GenerateData> = response
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(format!("bad generate payload: {}", e)))?;

        // An error inside a 200 envelope is the provider rejecting the input.
        if let Some(error) = envelope.error {
            return Err(ProviderError::invalid_input(format!("HeyGen error: {}", error)));
        }
        let data = envelope
            .data
            .ok_or_else(|| ProviderError::unavailable("generate payload missing data"))?;

        info!(video_id = %data.video_id, "Started avatar video generation");
        Ok(Submission::deferred(data.video_id))
    }

    async fn poll(&self, external_ref: &str) -> ProviderResult<PollOutcome> {
        let status = self.status(external_ref).await?;
        debug!(video_id = external_ref, status = %status.status, "Polled avatar video");

        match status.status.as_str() {
            "pending" | "waiting" | "processing" => Ok(PollOutcome::InProgress),
            "completed" => {
                let video_url = status.video_url.ok_or_else(|| {
                    ProviderError::unavailable("completed video has no video_url")
                })?;
                Ok(PollOutcome::Completed(json!({
                    "video_url": video_url,
                    "thumbnail_url": status.thumbnail_url,
                    "duration": status.duration,
                })))
            }
            "failed" => Ok(PollOutcome::Failed(
                status
                    .error
                    .unwrap_or_else(|| "video generation failed without detail".to_string()),
            )),
            other => Err(ProviderError::unavailable(format!(
                "unknown video status: {}",
                other
            ))),
        }
    }

    async fn fetch_artifact(&self, external_ref: &str) -> ProviderResult<Artifact> {
        match self.poll(external_ref).await? {
            PollOutcome::Completed(result) => {
                let url = result
                    .get("video_url")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ProviderError::unavailable("completed video has no video_url"))?;
                Ok(Artifact::Url(url.to_string()))
            }
            _ => Err(ProviderError::NotReady),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reels_models::AspectRatio;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String) -> AvatarProvider {
        AvatarProvider::new(AvatarConfig {
            api_key: "test-key".to_string(),
            base_url,
            request_timeout: Duration::from_secs(5),
            test_mode: true,
        })
        .unwrap()
    }

    fn avatar_params() -> JobParams {
        JobParams::AvatarVideo(AvatarVideoParams {
            script: "Привет из студии".to_string(),
            avatar_id: Some("Daisy-inskirt-20220818".to_string()),
            talking_photo_id: None,
            voice_id: "voice_1".to_string(),
            aspect_ratio: AspectRatio::Portrait,
            background_color: "#1a1a2e".to_string(),
        })
    }

    #[tokio::test]
    async fn test_submit_returns_video_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/video/generate"))
            .and(header("X-Api-Key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": null,
                "data": {"video_id": "vid_789"}
            })))
            .mount(&server)
            .await;

        let submission = provider(server.uri()).submit(&avatar_params()).await.unwrap();
        assert_eq!(submission.external_ref, "vid_789");
    }

    #[tokio::test]
    async fn test_submit_envelope_error_is_invalid_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/video/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "voice_id not found",
                "data": null
            })))
            .mount(&server)
            .await;

        let err = provider(server.uri()).submit(&avatar_params()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_poll_maps_waiting_to_in_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .and(query_param("video_id", "vid_789"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": null,
                "data": {"id": "vid_789", "status": "waiting"}
            })))
            .mount(&server)
            .await;

        let outcome = provider(server.uri()).poll("vid_789").await.unwrap();
        assert_eq!(outcome, PollOutcome::InProgress);
    }

    #[tokio::test]
    async fn test_poll_completed_carries_video_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": null,
                "data": {
                    "id": "vid_789",
                    "status": "completed",
                    "video_url": "https://cdn.heygen.com/vid_789.mp4",
                    "duration": 12.5
                }
            })))
            .mount(&server)
            .await;

        match provider(server.uri()).poll("vid_789").await.unwrap() {
            PollOutcome::Completed(result) => {
                assert_eq!(
                    result["video_url"].as_str().unwrap(),
                    "https://cdn.heygen.com/vid_789.mp4"
                );
            }
            other => panic!("expected completed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_unknown_status_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": null,
                "data": {"id": "vid_789", "status": "rendering_v3"}
            })))
            .mount(&server)
            .await;

        let err = provider(server.uri()).poll("vid_789").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_artifact_is_hosted_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": null,
                "data": {
                    "id": "vid_789",
                    "status": "completed",
                    "video_url": "https://cdn.heygen.com/vid_789.mp4"
                }
            })))
            .mount(&server)
            .await;

        match provider(server.uri()).fetch_artifact("vid_789").await.unwrap() {
            Artifact::Url(url) => assert_eq!(url, "https://cdn.heygen.com/vid_789.mp4"),
            other => panic!("expected url, got {:?}", other),
        }
    }
}
