//! IPC client environment configuration (spec.md §5, §6): connect/request
//! timeouts and the exponential backoff schedule used to dial the persistence
//! server.

use crate::infrastructure::ipc::client::IpcClientConfig;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub fn ipc_client_config_from_env() -> Result<IpcClientConfig> {
    Ok(IpcClientConfig {
        connect_timeout: Duration::from_millis(
            env::var("IPC_CONNECT_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Failed to parse IPC_CONNECT_TIMEOUT_MS")?,
        ),
        request_timeout: Duration::from_millis(
            env::var("IPC_REQUEST_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .context("Failed to parse IPC_REQUEST_TIMEOUT_MS")?,
        ),
        max_retries: env::var("IPC_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("Failed to parse IPC_MAX_RETRIES")?,
        base_retry_delay: Duration::from_millis(
            env::var("IPC_BASE_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .context("Failed to parse IPC_BASE_RETRY_DELAY_MS")?,
        ),
        max_retry_delay: Duration::from_millis(
            env::var("IPC_MAX_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Failed to parse IPC_MAX_RETRY_DELAY_MS")?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_cleanly() {
        let config = ipc_client_config_from_env().expect("defaults should parse");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }
}
