//! Gap writer environment configuration (spec.md §4.7, §6): queue caps and the
//! two interval tickers that flush the pending queue and drain the retry queue.

use crate::application::gap_writer::GapWriterConfig;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

pub fn gap_writer_config_from_env() -> Result<GapWriterConfig> {
    Ok(GapWriterConfig {
        max_queue_size: env::var("GAP_MAX_QUEUE_SIZE")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .context("Failed to parse GAP_MAX_QUEUE_SIZE")?,
        max_retry_queue_size: env::var("GAP_MAX_RETRY_QUEUE_SIZE")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .context("Failed to parse GAP_MAX_RETRY_QUEUE_SIZE")?,
        batch_size: env::var("GAP_BATCH_SIZE")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Failed to parse GAP_BATCH_SIZE")?,
        flush_interval: Duration::from_millis(
            env::var("GAP_FLUSH_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Failed to parse GAP_FLUSH_INTERVAL_MS")?,
        ),
        retry_interval: Duration::from_millis(
            env::var("GAP_RETRY_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Failed to parse GAP_RETRY_INTERVAL_MS")?,
        ),
        batch_max_retries: env::var("GAP_BATCH_MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .context("Failed to parse GAP_BATCH_MAX_RETRIES")?,
        batch_retry_delays_ms: env::var("GAP_BATCH_RETRY_DELAYS_MS")
            .unwrap_or_else(|_| "100,200,400".to_string())
            .split(',')
            .map(|s| s.trim().parse::<u64>())
            .collect::<std::result::Result<Vec<u64>, _>>()
            .context("Failed to parse GAP_BATCH_RETRY_DELAYS_MS")?,
        flush_timeout: Duration::from_millis(
            env::var("GAP_FLUSH_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("Failed to parse GAP_FLUSH_TIMEOUT_MS")?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_cleanly() {
        let config = gap_writer_config_from_env().expect("defaults should parse");
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_max_retries, 3);
        assert_eq!(config.batch_retry_delays_ms, vec![100, 200, 400]);
        assert_eq!(config.flush_timeout, Duration::from_millis(5000));
    }
}
