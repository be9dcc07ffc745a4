//! SQLite-backed persistence: schema, the three store adapters, and the queue
//! retention poller (spec.md §4.2, §5).

pub mod database;
pub mod gap_repository;
pub mod queue_repository;
pub mod server;
pub mod state_repository;
