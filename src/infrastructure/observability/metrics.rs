//! Prometheus metrics for the footprint engine. Grounded on the teacher's
//! `infrastructure/observability/metrics.rs` `Metrics` struct: a `Registry` plus
//! one field per named gauge/counter, registered once at construction and
//! rendered on demand. Push-based per the Cargo.toml note — there is no HTTP
//! scrape endpoint in this core (spec.md §1 Non-goals exclude REST
//! controllers); `render()` is read by whatever out-of-core exporter the
//! deployment wires in, or logged periodically by the orchestrator.

use prometheus::{CounterVec, GaugeVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tracing::warn;

/// All metrics use the `footprint_engine_` prefix.
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Arc<Registry>,
    /// Trades processed, by worker id.
    pub worker_trades_processed: IntCounterVec,
    /// Completed-candle events published, by worker id.
    pub worker_events_published: IntCounterVec,
    /// Errors recorded, by worker id.
    pub worker_errors_total: IntCounterVec,
    /// Average trade-processing latency in milliseconds, by worker id.
    pub worker_avg_processing_ms: GaugeVec,
    /// Worker count currently in the pool.
    pub pool_worker_count: IntGauge,
    /// Workers that failed to respond to a health check.
    pub pool_unhealthy_workers: IntGauge,
    /// Gap writer's in-memory pending queue depth.
    pub gap_writer_queue_size: IntGauge,
    /// Gap writer's retry queue depth.
    pub gap_writer_retry_queue_size: IntGauge,
    /// Gap records successfully persisted.
    pub gap_writer_processed_total: CounterVec,
    /// Gap records dropped by the bounded-queue backpressure policy.
    pub gap_writer_dropped_total: CounterVec,
    /// Gap batches that exhausted every in-batch retry.
    pub gap_writer_failed_total: CounterVec,
}

impl EngineMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let worker_trades_processed = IntCounterVec::new(
            Opts::new("footprint_engine_worker_trades_processed_total", "Trades processed per worker"),
            &["worker_id"],
        )?;
        registry.register(Box::new(worker_trades_processed.clone()))?;

        let worker_events_published = IntCounterVec::new(
            Opts::new("footprint_engine_worker_events_published_total", "Completed-candle events published per worker"),
            &["worker_id"],
        )?;
        registry.register(Box::new(worker_events_published.clone()))?;

        let worker_errors_total = IntCounterVec::new(
            Opts::new("footprint_engine_worker_errors_total", "Errors recorded per worker"),
            &["worker_id"],
        )?;
        registry.register(Box::new(worker_errors_total.clone()))?;

        let worker_avg_processing_ms = GaugeVec::new(
            Opts::new("footprint_engine_worker_avg_processing_ms", "Rolling average trade-processing latency per worker"),
            &["worker_id"],
        )?;
        registry.register(Box::new(worker_avg_processing_ms.clone()))?;

        let pool_worker_count = IntGauge::with_opts(Opts::new("footprint_engine_pool_worker_count", "Workers currently in the pool"))?;
        registry.register(Box::new(pool_worker_count.clone()))?;

        let pool_unhealthy_workers =
            IntGauge::with_opts(Opts::new("footprint_engine_pool_unhealthy_workers", "Workers that failed their last health check"))?;
        registry.register(Box::new(pool_unhealthy_workers.clone()))?;

        let gap_writer_queue_size = IntGauge::with_opts(Opts::new("footprint_engine_gap_writer_queue_size", "Gap writer pending-queue depth"))?;
        registry.register(Box::new(gap_writer_queue_size.clone()))?;

        let gap_writer_retry_queue_size =
            IntGauge::with_opts(Opts::new("footprint_engine_gap_writer_retry_queue_size", "Gap writer retry-queue depth"))?;
        registry.register(Box::new(gap_writer_retry_queue_size.clone()))?;

        let gap_writer_processed_total = CounterVec::new(
            Opts::new("footprint_engine_gap_writer_processed_total", "Gap records successfully persisted"),
            &["exchange"],
        )?;
        registry.register(Box::new(gap_writer_processed_total.clone()))?;

        let gap_writer_dropped_total = CounterVec::new(
            Opts::new("footprint_engine_gap_writer_dropped_total", "Gap records dropped by backpressure"),
            &["exchange"],
        )?;
        registry.register(Box::new(gap_writer_dropped_total.clone()))?;

        let gap_writer_failed_total = CounterVec::new(
            Opts::new("footprint_engine_gap_writer_failed_total", "Gap batches that exhausted in-batch retries"),
            &["exchange"],
        )?;
        registry.register(Box::new(gap_writer_failed_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            worker_trades_processed,
            worker_events_published,
            worker_errors_total,
            worker_avg_processing_ms,
            pool_worker_count,
            pool_unhealthy_workers,
            gap_writer_queue_size,
            gap_writer_retry_queue_size,
            gap_writer_processed_total,
            gap_writer_dropped_total,
            gap_writer_failed_total,
        })
    }

    pub fn record_trade(&self, worker_id: usize, processing_ms: f64) {
        let label = worker_id.to_string();
        self.worker_trades_processed.with_label_values(&[&label]).inc();
        self.worker_avg_processing_ms.with_label_values(&[&label]).set(processing_ms);
    }

    pub fn record_event_published(&self, worker_id: usize) {
        self.worker_events_published.with_label_values(&[&worker_id.to_string()]).inc();
    }

    pub fn record_worker_error(&self, worker_id: usize) {
        self.worker_errors_total.with_label_values(&[&worker_id.to_string()]).inc();
    }

    pub fn set_pool_health(&self, worker_count: usize, unhealthy: usize) {
        self.pool_worker_count.set(worker_count as i64);
        self.pool_unhealthy_workers.set(unhealthy as i64);
    }

    /// Snapshots the gap writer's atomic counters (spec.md §4.7) into the
    /// gauges/counters above. Counters only move forward, so this adds the
    /// delta since the last sample rather than re-setting an absolute value.
    pub fn sync_gap_writer(&self, exchange: &str, queue_size: u64, retry_queue_size: u64, processed_delta: u64, dropped_delta: u64, failed_delta: u64) {
        self.gap_writer_queue_size.set(queue_size as i64);
        self.gap_writer_retry_queue_size.set(retry_queue_size as i64);
        if processed_delta > 0 {
            self.gap_writer_processed_total.with_label_values(&[exchange]).inc_by(processed_delta as f64);
        }
        if dropped_delta > 0 {
            self.gap_writer_dropped_total.with_label_values(&[exchange]).inc_by(dropped_delta as f64);
        }
        if failed_delta > 0 {
            self.gap_writer_failed_total.with_label_values(&[exchange]).inc_by(failed_delta as f64);
        }
    }

    /// Render all metrics in Prometheus text format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).unwrap_or_else(|e| {
            warn!("failed to encode metrics: {e}");
            String::new()
        })
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new().expect("failed to construct default EngineMetrics")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_renders_worker_trade_counters() {
        let metrics = EngineMetrics::new().expect("metrics should construct");
        metrics.record_trade(0, 1.5);
        metrics.record_trade(0, 2.5);
        let output = metrics.render();
        assert!(output.contains("footprint_engine_worker_trades_processed_total"));
        assert!(output.contains("worker_id=\"0\""));
    }

    #[test]
    fn gap_writer_sync_accumulates_counters() {
        let metrics = EngineMetrics::new().expect("metrics should construct");
        metrics.sync_gap_writer("binance", 3, 1, 5, 2, 0);
        metrics.sync_gap_writer("binance", 1, 0, 2, 0, 1);
        let output = metrics.render();
        assert!(output.contains("footprint_engine_gap_writer_processed_total{exchange=\"binance\"} 7"));
        assert!(output.contains("footprint_engine_gap_writer_dropped_total{exchange=\"binance\"} 2"));
        assert!(output.contains("footprint_engine_gap_writer_failed_total{exchange=\"binance\"} 1"));
    }
}
