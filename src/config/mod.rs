//! Configuration module for the footprint engine.
//!
//! Structured configuration loading from environment variables, organized by
//! domain, following the teacher's `Config::from_env()` + per-domain sub-config
//! pattern (`src/config.rs`): `env::var(..).unwrap_or_else(|| default).parse()`
//! with `.context("Failed to parse X")`.

mod engine_config;
mod gap_writer_config;
mod ipc_config;
mod observability_config;
mod queue_config;

pub use engine_config::EngineEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use queue_config::QueueConfig;

use crate::application::gap_writer::GapWriterConfig;
use crate::infrastructure::ipc::client::IpcClientConfig;
use anyhow::{Context, Result};

/// Aggregates every sub-config into the single struct threaded through
/// `Orchestrator::build` (spec.md §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineEnvConfig,
    pub ipc_client: IpcClientConfig,
    pub gap_writer: GapWriterConfig,
    pub queue: QueueConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            engine: EngineEnvConfig::from_env().context("Failed to load engine config")?,
            ipc_client: ipc_config::ipc_client_config_from_env().context("Failed to load IPC client config")?,
            gap_writer: gap_writer_config::gap_writer_config_from_env().context("Failed to load gap writer config")?,
            queue: queue_config::queue_config_from_env().context("Failed to load queue config")?,
            observability: ObservabilityEnvConfig::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_env_loads_defaults() {
        let config = Config::from_env().expect("should parse with defaults");
        assert_eq!(config.engine.worker_count, 4);
        assert_eq!(config.gap_writer.batch_size, 10);
    }
}
