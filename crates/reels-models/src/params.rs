//! Kind-specific job request parameters.
//!
//! Callers submit `{kind, params}`; the params half is deserialized into one
//! of these structs and validated before anything is sent to a provider.
//! Validation failure is an `InvalidInput` at the API boundary and is never
//! retried.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::job::JobKind;

/// Params failed validation or did not match the declared kind.
#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("invalid params: {0}")]
    Invalid(String),

    #[error("params do not match kind {0}")]
    KindMismatch(JobKind),
}

/// Output aspect ratio for generated videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum AspectRatio {
    #[serde(rename = "16:9")]
    Landscape,
    /// Reels-native portrait format
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
        }
    }
}

/// Params for LLM transcript analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct VideoAnalysisParams {
    /// Transcript text to analyze
    #[validate(length(min = 1, max = 50000))]
    pub transcript: String,

    /// ISO language code of the transcript
    #[serde(default = "default_language")]
    #[validate(length(min = 2, max = 8))]
    pub language: String,

    /// Source reel URL, kept for audit only
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub video_url: Option<String>,
}

fn default_language() -> String {
    "ru".to_string()
}

/// Params for video dubbing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct DubbingParams {
    /// Publicly fetchable source media URL
    #[validate(url)]
    pub source_url: String,

    /// Source language, auto-detected by the provider when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 8))]
    pub source_lang: Option<String>,

    /// Target language to dub into
    #[validate(length(min = 2, max = 8))]
    pub target_lang: String,

    /// Speaker count hint for the provider
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 10))]
    pub num_speakers: Option<u8>,

    /// Whether the provider watermark is acceptable
    #[serde(default)]
    pub watermark: bool,
}

/// Params for AI avatar video generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
pub struct AvatarVideoParams {
    /// Text the avatar speaks
    #[validate(length(min = 1, max = 5000))]
    pub script: String,

    /// Stock avatar to use; mutually exclusive with `talking_photo_id`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_id: Option<String>,

    /// User-uploaded talking photo to animate instead of a stock avatar
    #[serde(skip_serializing_if = "Option::is_none")]
    pub talking_photo_id: Option<String>,

    /// Provider voice to synthesize the script with
    #[validate(length(min = 1))]
    pub voice_id: String,

    /// Output aspect ratio
    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Background color, hex
    #[serde(default = "default_background")]
    pub background_color: String,
}

fn default_background() -> String {
    "#1a1a2e".to_string()
}

/// Tagged union of all kind-specific params.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum JobParams {
    VideoAnalysis(VideoAnalysisParams),
    Dubbing(DubbingParams),
    AvatarVideo(AvatarVideoParams),
}

impl JobParams {
    /// The job kind these params belong to.
    pub fn kind(&self) -> JobKind {
        match self {
            JobParams::VideoAnalysis(_) => JobKind::VideoAnalysis,
            JobParams::Dubbing(_) => JobKind::Dubbing,
            JobParams::AvatarVideo(_) => JobKind::AvatarVideo,
        }
    }

    /// Validate the inner params.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let result = match self {
            JobParams::VideoAnalysis(p) => p.validate(),
            JobParams::Dubbing(p) => p.validate(),
            JobParams::AvatarVideo(p) => p.validate(),
        };
        result.map_err(|e| ParamsError::Invalid(e.to_string()))?;

        if let JobParams::AvatarVideo(p) = self {
            // Exactly one character source.
            if p.avatar_id.is_some() == p.talking_photo_id.is_some() {
                return Err(ParamsError::Invalid(
                    "exactly one of avatar_id or talking_photo_id is required".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Deserialize params from their stored JSON representation.
    pub fn from_stored(kind: JobKind, params: &serde_json::Value) -> Result<Self, ParamsError> {
        let parsed = match kind {
            JobKind::VideoAnalysis => serde_json::from_value(params.clone())
                .map(JobParams::VideoAnalysis),
            JobKind::Dubbing => serde_json::from_value(params.clone()).map(JobParams::Dubbing),
            JobKind::AvatarVideo => {
                serde_json::from_value(params.clone()).map(JobParams::AvatarVideo)
            }
        };
        parsed.map_err(|e| ParamsError::Invalid(e.to_string()))
    }

    /// Serialize the inner params for storage, without the kind tag.
    pub fn to_stored(&self) -> serde_json::Value {
        match self {
            JobParams::VideoAnalysis(p) => serde_json::to_value(p),
            JobParams::Dubbing(p) => serde_json::to_value(p),
            JobParams::AvatarVideo(p) => serde_json::to_value(p),
        }
        .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dubbing_params_validate() {
        let params = JobParams::Dubbing(DubbingParams {
            source_url: "https://cdn.example.com/reel.mp4".to_string(),
            source_lang: Some("ru".to_string()),
            target_lang: "en".to_string(),
            num_speakers: Some(1),
            watermark: false,
        });
        assert!(params.validate().is_ok());
        assert_eq!(params.kind(), JobKind::Dubbing);
    }

    #[test]
    fn test_dubbing_params_reject_bad_url() {
        let params = JobParams::Dubbing(DubbingParams {
            source_url: "not-a-url".to_string(),
            source_lang: None,
            target_lang: "en".to_string(),
            num_speakers: None,
            watermark: false,
        });
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_avatar_params_require_one_character_source() {
        let base = AvatarVideoParams {
            script: "Привет, это тест".to_string(),
            avatar_id: None,
            talking_photo_id: None,
            voice_id: "voice_1".to_string(),
            aspect_ratio: AspectRatio::Portrait,
            background_color: default_background(),
        };

        // Neither source set
        assert!(JobParams::AvatarVideo(base.clone()).validate().is_err());

        // Both set
        let mut both = base.clone();
        both.avatar_id = Some("a".to_string());
        both.talking_photo_id = Some("t".to_string());
        assert!(JobParams::AvatarVideo(both).validate().is_err());

        // Exactly one
        let mut one = base;
        one.avatar_id = Some("a".to_string());
        assert!(JobParams::AvatarVideo(one).validate().is_ok());
    }

    #[test]
    fn test_tagged_request_shape() {
        let value = json!({
            "kind": "dubbing",
            "params": {
                "source_url": "https://cdn.example.com/reel.mp4",
                "source_lang": "ru",
                "target_lang": "en"
            }
        });
        let params: JobParams = serde_json::from_value(value).unwrap();
        assert_eq!(params.kind(), JobKind::Dubbing);
    }

    #[test]
    fn test_stored_roundtrip() {
        let params = JobParams::VideoAnalysis(VideoAnalysisParams {
            transcript: "Сегодня расскажу про хуки".to_string(),
            language: "ru".to_string(),
            video_url: None,
        });
        let stored = params.to_stored();
        let back = JobParams::from_stored(JobKind::VideoAnalysis, &stored).unwrap();
        assert_eq!(back.kind(), JobKind::VideoAnalysis);
    }

    #[test]
    fn test_aspect_ratio_serde() {
        assert_eq!(
            serde_json::to_string(&AspectRatio::Portrait).unwrap(),
            "\"9:16\""
        );
    }
}
