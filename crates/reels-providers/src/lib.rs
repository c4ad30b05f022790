//! Adapters for the external media providers.
//!
//! Each adapter translates the orchestrator's generic submit/poll/fetch calls
//! into one provider's wire protocol and normalizes the responses back into
//! the shared vocabulary. Provider quirks (status strings, auth headers,
//! envelope shapes) stay inside this crate.

pub mod adapter;
pub mod analysis;
pub mod avatar;
pub mod dubbing;
pub mod error;

pub use adapter::{Artifact, PollOutcome, ProviderAdapter, Submission};
pub use analysis::{AnalysisConfig, AnalysisProvider};
pub use avatar::{AvatarConfig, AvatarProvider};
pub use dubbing::{DubbingConfig, DubbingProvider};
pub use error::{ProviderError, ProviderResult};
