//! Core engine environment configuration — worker pool sizing, the IPC socket
//! path, and the timeouts that bound startup and shutdown (spec.md §6).

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineEnvConfig {
    pub exchange: String,
    pub worker_count: usize,
    pub socket_path: String,
    pub ready_timeout: Duration,
    pub shutdown_flush_timeout: Duration,
    pub database_url: String,
    pub max_connections: usize,
    pub mailbox_capacity: usize,
    pub dirty_flush_interval: Duration,
}

impl EngineEnvConfig {
    pub fn from_env() -> Result<Self> {
        let worker_count = env::var("WORKER_COUNT")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<usize>()
            .context("Failed to parse WORKER_COUNT")?;
        if worker_count == 0 {
            anyhow::bail!("WORKER_COUNT must be at least 1");
        }

        Ok(Self {
            exchange: env::var("EXCHANGE").unwrap_or_else(|_| "binance".to_string()),
            worker_count,
            socket_path: env::var("SOCKET_PATH").unwrap_or_else(|_| "/tmp/footprint-engine.sock".to_string()),
            ready_timeout: Duration::from_millis(
                env::var("READY_TIMEOUT_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .context("Failed to parse READY_TIMEOUT_MS")?,
            ),
            shutdown_flush_timeout: Duration::from_millis(
                env::var("SHUTDOWN_FLUSH_TIMEOUT_MS")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()
                    .context("Failed to parse SHUTDOWN_FLUSH_TIMEOUT_MS")?,
            ),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/footprint-engine.db".to_string()),
            max_connections: env::var("IPC_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "64".to_string())
                .parse()
                .context("Failed to parse IPC_MAX_CONNECTIONS")?,
            mailbox_capacity: env::var("WORKER_MAILBOX_CAPACITY")
                .unwrap_or_else(|_| "4096".to_string())
                .parse()
                .context("Failed to parse WORKER_MAILBOX_CAPACITY")?,
            dirty_flush_interval: Duration::from_millis(
                env::var("WORKER_FLUSH_INTERVAL_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("Failed to parse WORKER_FLUSH_INTERVAL_MS")?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_cleanly() {
        let config = EngineEnvConfig::from_env().expect("defaults should parse");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.ready_timeout, Duration::from_secs(10));
    }
}
