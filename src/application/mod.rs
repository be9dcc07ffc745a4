pub mod bootstrap;
pub mod gap_writer;
pub mod processor;
pub mod router;
pub mod worker_runtime;
