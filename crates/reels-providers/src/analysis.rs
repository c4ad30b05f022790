//! LLM transcript analysis adapter.
//!
//! Unlike dubbing and avatar generation there is no provider-side job here:
//! the chat completion endpoint answers within the submit round trip, so
//! `submit` returns an immediate result and the orchestrator records
//! completion without ever scheduling polling.
//!
//! The model's output is validated against [`AnalysisReport`]; a payload that
//! does not parse is treated as a transient provider error, never stored
//! verbatim and never a crash.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use reels_models::{AnalysisReport, JobKind, JobParams, VideoAnalysisParams};

use crate::adapter::{Artifact, PollOutcome, ProviderAdapter, Submission};
use crate::error::{error_from_response, ProviderError, ProviderResult};

/// Analysis provider configuration.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl AnalysisConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ProviderResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ProviderError::unavailable("OPENAI_API_KEY not set"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            request_timeout: Duration::from_secs(60),
        })
    }
}

/// OpenAI-compatible chat completion client for transcript analysis.
pub struct AnalysisProvider {
    client: Client,
    config: AnalysisConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl AnalysisProvider {
    pub fn new(config: AnalysisConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> ProviderResult<Self> {
        Self::new(AnalysisConfig::from_env()?)
    }

    fn build_prompt(params: &VideoAnalysisParams) -> String {
        format!(
            r#"Ты — эксперт по анализу контента Instagram Reels.

ЗАДАЧА: Проанализировать транскрипт видео и дать оценку.

ТРАНСКРИПТ:
{transcript}

ЯЗЫК: {language}

Оцени:
1. Качество хука (первые 3-7 секунд)
2. Наличие и качество CTA
3. Общий sentiment
4. Темп речи (норма 120-150 WPM)
5. Ключевые моменты

ФОРМАТ ОТВЕТА (JSON):
{{
  "summary": "Краткое содержание видео",
  "key_points": ["Ключевой пункт 1", "Ключевой пункт 2"],
  "hook_analysis": {{
    "detected": true,
    "quality": "strong | weak | missing",
    "suggestion": "Совет по улучшению хука"
  }},
  "cta_analysis": {{
    "detected": true,
    "type": "engagement | follow | share | action",
    "suggestion": "Совет по улучшению CTA"
  }},
  "wpm": 135,
  "sentiment": "positive | negative | neutral",
  "recommendations": ["Рекомендация 1", "Рекомендация 2"]
}}

Верни ТОЛЬКО один JSON-объект и ничего больше."#,
            transcript = params.transcript,
            language = params.language,
        )
    }

    async fn analyze(&self, params: &VideoAnalysisParams) -> ProviderResult<AnalysisReport> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Self::build_prompt(params),
                },
                ChatMessage {
                    role: "user",
                    content: "Проанализируй этот транскрипт.".to_string(),
                },
            ],
            temperature: 0.3,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response("OpenAI", response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(format!("bad completion payload: {}", e)))?;

        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ProviderError::unavailable("no choices in completion"))?;

        parse_report(content)
    }
}

/// Parse model output into the report schema, tolerating markdown fences.
fn parse_report(text: &str) -> ProviderResult<AnalysisReport> {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);

    serde_json::from_str(text.trim())
        .map_err(|e| ProviderError::unavailable(format!("analysis did not match schema: {}", e)))
}

#[async_trait]
impl ProviderAdapter for AnalysisProvider {
    fn kind(&self) -> JobKind {
        JobKind::VideoAnalysis
    }

    async fn submit(&self, params: &JobParams) -> ProviderResult<Submission> {
        let JobParams::VideoAnalysis(params) = params else {
            return Err(ProviderError::invalid_input("expected analysis params"));
        };

        debug!(
            transcript_len = params.transcript.len(),
            language = %params.language,
            "Analyzing transcript"
        );
        let report = self.analyze(params).await?;
        info!(wpm = report.wpm, "Transcript analysis complete");

        let result = serde_json::to_value(&report)
            .map_err(|e| ProviderError::unavailable(format!("report serialization: {}", e)))?;
        Ok(Submission::immediate(
            format!("analysis_{}", Uuid::new_v4()),
            result,
        ))
    }

    async fn poll(&self, _external_ref: &str) -> ProviderResult<PollOutcome> {
        // Analysis completes within submit; the orchestrator never gets here.
        Err(ProviderError::invalid_input(
            "analysis jobs have no poll phase",
        ))
    }

    async fn fetch_artifact(&self, _external_ref: &str) -> ProviderResult<Artifact> {
        // The report is stored inline as the job result.
        Err(ProviderError::invalid_input(
            "analysis results are returned inline",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String) -> AnalysisProvider {
        AnalysisProvider::new(AnalysisConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "gpt-4o-mini".to_string(),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn analysis_params() -> JobParams {
        JobParams::VideoAnalysis(VideoAnalysisParams {
            transcript: "Привет! Сегодня про хуки.".to_string(),
            language: "ru".to_string(),
            video_url: None,
        })
    }

    fn report_json() -> String {
        serde_json::json!({
            "summary": "Видео про хуки",
            "key_points": ["Хук в первые 3 секунды"],
            "hook_analysis": {"detected": true, "quality": "strong"},
            "cta_analysis": {"detected": false},
            "wpm": 140,
            "sentiment": "positive",
            "recommendations": ["Добавить CTA"]
        })
        .to_string()
    }

    fn completion_body(content: String) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn test_submit_completes_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(report_json())))
            .mount(&server)
            .await;

        let submission = provider(server.uri()).submit(&analysis_params()).await.unwrap();
        assert!(submission.external_ref.starts_with("analysis_"));
        let result = submission.immediate_result.unwrap();
        assert_eq!(result["wpm"], 140);
    }

    #[tokio::test]
    async fn test_fenced_output_is_tolerated() {
        let server = MockServer::start().await;
        let fenced = format!("```json\n{}\n```", report_json());
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(fenced)))
            .mount(&server)
            .await;

        let submission = provider(server.uri()).submit(&analysis_params()).await.unwrap();
        assert!(submission.immediate_result.is_some());
    }

    #[tokio::test]
    async fn test_schema_drift_is_transient_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
                "here is your analysis: it looks great!".to_string(),
            )))
            .mount(&server)
            .await;

        let err = provider(server.uri()).submit(&analysis_params()).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(server.uri()).submit(&analysis_params()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
