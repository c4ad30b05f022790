//! Durable persistence for job records.
//!
//! All mutation goes through the [`JobStore`] transition methods so the state
//! machine invariants cannot be violated by a partial update. The production
//! backend is Redis; `MemoryJobStore` backs tests and local development.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryJobStore;
pub use redis_store::{RedisJobStore, RedisStoreConfig};
pub use store::{JobStore, TerminalOutcome};
