//! Queue poller environment configuration (spec.md §4.2, §6): the fallback
//! fire-and-forget channel's batch size, poll interval, and retention window.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
    pub retention: Duration,
}

pub fn queue_config_from_env() -> Result<QueueConfig> {
    Ok(QueueConfig {
        batch_size: env::var("QUEUE_BATCH_SIZE")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .context("Failed to parse QUEUE_BATCH_SIZE")?,
        poll_interval: Duration::from_millis(
            env::var("QUEUE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Failed to parse QUEUE_POLL_INTERVAL_MS")?,
        ),
        retention: Duration::from_secs(
            env::var("QUEUE_RETENTION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse::<u64>()
                .context("Failed to parse QUEUE_RETENTION_HOURS")?
                * 3600,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_cleanly() {
        let config = queue_config_from_env().expect("defaults should parse");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert_eq!(config.retention, Duration::from_secs(24 * 3600));
    }
}
