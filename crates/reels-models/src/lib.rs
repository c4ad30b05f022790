//! Shared data models for the Reels Studio backend.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs delegated to external media providers
//! - The job status state machine and its transition guard
//! - Kind-specific request parameters with validation
//! - Typed provider result payloads

pub mod analysis;
pub mod job;
pub mod params;

// Re-export common types
pub use analysis::{AnalysisReport, CtaAnalysis, HookAnalysis, HookQuality, Sentiment};
pub use job::{Job, JobId, JobKind, JobStatus, JobSummary, TransitionError};
pub use params::{
    AspectRatio, AvatarVideoParams, DubbingParams, JobParams, ParamsError, VideoAnalysisParams,
};
