//! Problem Collector Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod collector;
pub mod config;
pub mod problem_store;
pub mod server;
pub mod sources;
pub mod sqlite_persistence;
pub mod status_store;

// Re-export commonly used types for convenience
pub use collector::{create_collector, CollectorContext, CollectorHandle, CollectorMetrics};
pub use problem_store::{ProblemStore, SqliteProblemStore};
pub use server::{run_server, RequestsLoggingLevel, ServerState};
pub use status_store::{InMemoryJobStatusStore, JobStatusStore, SqliteJobStatusStore};
