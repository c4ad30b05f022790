//! Typed result schema for LLM transcript analysis.
//!
//! The analysis provider asks the model for a JSON object and deserializes it
//! into [`AnalysisReport`]. A payload that does not match this schema is a
//! provider-side error, not a crash: the adapter maps it to a retryable
//! failure instead of storing free-form text.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Hook quality as judged by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HookQuality {
    Strong,
    Weak,
    Missing,
}

/// Overall sentiment of the reel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Assessment of the opening hook (first 3-7 seconds).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HookAnalysis {
    pub detected: bool,
    pub quality: HookQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Assessment of the call to action.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CtaAnalysis {
    pub detected: bool,
    /// engagement / follow / share / action
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub cta_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Full transcript analysis returned by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub summary: String,
    pub key_points: Vec<String>,
    pub hook_analysis: HookAnalysis,
    pub cta_analysis: CtaAnalysis,
    /// Words per minute; 120-150 is the target band
    pub wpm: u32,
    pub sentiment: Sentiment,
    pub recommendations: Vec<String>,
}
