//! Job orchestration.
//!
//! The orchestrator owns the job state machine end to end: it creates the
//! record, hands work to the matching provider adapter, schedules server-side
//! polling at a bounded cadence, and writes every transition through the job
//! store before returning control. Status reads never touch providers, so
//! any number of concurrent viewers cost the provider nothing.

pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod retry;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{JobArtifact, JobOrchestrator};
pub use policy::PollPolicy;
