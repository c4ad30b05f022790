//! Provider error taxonomy.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Params failed provider-side validation; never retried.
    #[error("InvalidInput: {0}")]
    InvalidInput(String),

    /// Transient network/provider error. Retryable; must never be conflated
    /// with the job itself failing.
    #[error("ProviderUnavailable: {0}")]
    Unavailable(String),

    /// Artifact requested before the job completed.
    #[error("NotReady")]
    NotReady,
}

impl ProviderError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether a bounded retry is worth attempting.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Unavailable(e.to_string())
    }
}

/// Map a non-success HTTP response to the taxonomy: client-side rejections
/// become `InvalidInput`, everything else (5xx, 429, timeouts) is transient.
/// The provider's raw body is preserved in the message for `Job.error`.
pub(crate) async fn error_from_response(
    provider: &str,
    response: reqwest::Response,
) -> ProviderError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = format!("{} returned {}: {}", provider, status, body);

    if status == reqwest::StatusCode::BAD_REQUEST
        || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        || status == reqwest::StatusCode::PAYLOAD_TOO_LARGE
        || status == reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE
    {
        ProviderError::InvalidInput(detail)
    } else {
        ProviderError::Unavailable(detail)
    }
}
