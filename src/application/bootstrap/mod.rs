//! Lifecycle orchestrator — ordered startup/shutdown across the persistence
//! server, the worker pool, and ingestion (spec.md §2, §4.9).

pub mod orchestrator;

pub use orchestrator::{Orchestrator, OrchestratorHandle, ShutdownReport};
