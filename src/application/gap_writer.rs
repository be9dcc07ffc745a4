//! GapWriter — a non-blocking fallback path for gap records so a slow or down
//! persistence server never stalls trade processing (spec.md §4.7).
//!
//! Grounded on the teacher's `tokio::select! { cmd_rx.recv() => ..., interval.tick()
//! => ... }` agent loop shape (`application/agents/sentinel.rs`), here driving two
//! independent interval tasks over two bounded queues instead of one mailbox.

use crate::domain::ports::{GapStore, QueueStore};
use crate::domain::market::gap::GapRecord;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct GapWriterMetrics {
    pub queue_size: AtomicU64,
    pub retry_queue_size: AtomicU64,
    pub processed_count: AtomicU64,
    pub dropped_count: AtomicU64,
    pub failed_count: AtomicU64,
}

pub struct GapWriterMetricsSnapshot {
    pub queue_size: u64,
    pub retry_queue_size: u64,
    pub processed_count: u64,
    pub dropped_count: u64,
    pub failed_count: u64,
}

#[derive(Debug, Clone)]
pub struct GapWriterConfig {
    pub max_queue_size: usize,
    pub max_retry_queue_size: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub retry_interval: Duration,
    /// In-batch retry attempts before a batch is moved to the retry queue
    /// (spec.md §4.7, §6 `batchMaxRetries`).
    pub batch_max_retries: usize,
    /// Delay before each in-batch retry attempt, ms (spec.md §6 `batchRetryDelays[]`).
    /// Indexed by attempt number; the last entry repeats if `batch_max_retries`
    /// exceeds the list length.
    pub batch_retry_delays_ms: Vec<u64>,
    /// Deadline for `flush_all` to drain both queues before giving up
    /// (spec.md §6 `flushTimeoutMs`).
    pub flush_timeout: Duration,
}

impl Default for GapWriterConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            max_retry_queue_size: 500,
            batch_size: 10,
            flush_interval: Duration::from_millis(1000),
            retry_interval: Duration::from_millis(5000),
            batch_max_retries: 3,
            batch_retry_delays_ms: vec![100, 200, 400],
            flush_timeout: Duration::from_millis(5000),
        }
    }
}

enum GapWriterCommand {
    Submit(GapRecord),
    FlushAll { deadline: Duration, done: tokio::sync::oneshot::Sender<()> },
    Shutdown,
}

/// Handle for submitting gap records; the writer's queues and background tasks
/// live behind the spawned `run` loop.
#[derive(Clone)]
pub struct GapWriterHandle {
    cmd_tx: mpsc::Sender<GapWriterCommand>,
    metrics: Arc<GapWriterMetrics>,
    default_flush_timeout: Duration,
}

impl GapWriterHandle {
    /// Fire-and-forget submit (spec.md §4.3 step 3). Never blocks the caller.
    pub fn submit(&self, gap: GapRecord) {
        if self.cmd_tx.try_send(GapWriterCommand::Submit(gap)).is_err() {
            self.metrics.dropped_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub async fn flush_all(&self, timeout: Duration) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        if self.cmd_tx.send(GapWriterCommand::FlushAll { deadline: timeout, done: tx }).await.is_ok() {
            let _ = tokio::time::timeout(timeout, rx).await;
        }
    }

    /// `flush_all` using `config.flush_timeout` (spec.md §6 `flushTimeoutMs`) as
    /// the deadline, for callers with no shutdown-specific timeout of their own.
    pub async fn flush_all_default(&self) {
        self.flush_all(self.default_flush_timeout).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(GapWriterCommand::Shutdown).await;
    }

    pub fn metrics(&self) -> GapWriterMetricsSnapshot {
        GapWriterMetricsSnapshot {
            queue_size: self.metrics.queue_size.load(Ordering::Relaxed),
            retry_queue_size: self.metrics.retry_queue_size.load(Ordering::Relaxed),
            processed_count: self.metrics.processed_count.load(Ordering::Relaxed),
            dropped_count: self.metrics.dropped_count.load(Ordering::Relaxed),
            failed_count: self.metrics.failed_count.load(Ordering::Relaxed),
        }
    }
}

/// Spawns the writer's background task and returns a cloneable handle.
///
/// `queue_store`, when present, is the fallback fire-and-forget channel
/// (spec.md §4.2 queue family): a batch that is permanently dropped because the
/// retry queue itself is full is spilled there instead of silently lost.
pub fn spawn(store: Arc<dyn GapStore>, queue_store: Option<Arc<dyn QueueStore>>, config: GapWriterConfig) -> GapWriterHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.max_queue_size.max(16));
    let metrics = Arc::new(GapWriterMetrics::default());
    let default_flush_timeout = config.flush_timeout;
    let handle = GapWriterHandle { cmd_tx, metrics: metrics.clone(), default_flush_timeout };

    tokio::spawn(run(store, queue_store, config, cmd_rx, metrics));

    handle
}

/// Hands a batch that fell out of both queues off to the queue fallback
/// channel (spec.md §4.2). Fire-and-forget: the IPC round trip isn't worth
/// blocking the writer's own loop over, so this runs on its own task.
fn spill_to_queue(queue_store: &Option<Arc<dyn QueueStore>>, batch: Vec<GapRecord>) {
    let Some(queue_store) = queue_store.clone() else { return };
    tokio::spawn(async move {
        let payload = serde_json::json!({"gaps": batch});
        if let Err(e) = queue_store.enqueue("gap_batch_dropped", payload).await {
            warn!("gap writer: queue fallback enqueue failed: {e}");
        }
    });
}

async fn run(
    store: Arc<dyn GapStore>,
    queue_store: Option<Arc<dyn QueueStore>>,
    config: GapWriterConfig,
    mut cmd_rx: mpsc::Receiver<GapWriterCommand>,
    metrics: Arc<GapWriterMetrics>,
) {
    let pending: Arc<Mutex<VecDeque<GapRecord>>> = Arc::new(Mutex::new(VecDeque::new()));
    let retry_queue: Arc<Mutex<VecDeque<Vec<GapRecord>>>> = Arc::new(Mutex::new(VecDeque::new()));

    let mut flush_ticker = tokio::time::interval(config.flush_interval);
    let mut retry_ticker = tokio::time::interval(config.retry_interval);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(GapWriterCommand::Submit(gap)) => {
                        let mut queue = pending.lock().await;
                        if queue.len() >= config.max_queue_size {
                            queue.pop_front();
                            metrics.dropped_count.fetch_add(1, Ordering::Relaxed);
                        }
                        queue.push_back(gap);
                        metrics.queue_size.store(queue.len() as u64, Ordering::Relaxed);
                    }
                    Some(GapWriterCommand::FlushAll { deadline, done }) => {
                        let _ = tokio::time::timeout(deadline, async {
                            drain_pending(&store, &queue_store, &pending, &retry_queue, &config, &metrics).await;
                            drain_retry_queue(&store, &queue_store, &retry_queue, &config, &metrics).await;
                        }).await;
                        let _ = done.send(());
                    }
                    Some(GapWriterCommand::Shutdown) | None => {
                        debug!("gap writer shutting down");
                        break;
                    }
                }
            }
            _ = flush_ticker.tick() => {
                drain_pending(&store, &queue_store, &pending, &retry_queue, &config, &metrics).await;
            }
            _ = retry_ticker.tick() => {
                drain_retry_queue(&store, &queue_store, &retry_queue, &config, &metrics).await;
            }
        }
    }
}

async fn drain_pending(
    store: &Arc<dyn GapStore>,
    queue_store: &Option<Arc<dyn QueueStore>>,
    pending: &Arc<Mutex<VecDeque<GapRecord>>>,
    retry_queue: &Arc<Mutex<VecDeque<Vec<GapRecord>>>>,
    config: &GapWriterConfig,
    metrics: &Arc<GapWriterMetrics>,
) {
    let batch: Vec<GapRecord> = {
        let mut queue = pending.lock().await;
        let n = queue.len().min(config.batch_size);
        let batch = queue.drain(..n).collect();
        metrics.queue_size.store(queue.len() as u64, Ordering::Relaxed);
        batch
    };
    if batch.is_empty() {
        return;
    }

    if save_with_retries(store, &batch, config, metrics).await {
        return;
    }

    let mut retries = retry_queue.lock().await;
    if retries.len() >= config.max_retry_queue_size {
        let overflowed = retries.pop_front();
        metrics.dropped_count.fetch_add(1, Ordering::Relaxed);
        if let Some(overflowed) = overflowed {
            spill_to_queue(queue_store, overflowed);
        }
    }
    retries.push_back(batch);
    metrics.retry_queue_size.store(retries.len() as u64, Ordering::Relaxed);
}

async fn drain_retry_queue(
    store: &Arc<dyn GapStore>,
    queue_store: &Option<Arc<dyn QueueStore>>,
    retry_queue: &Arc<Mutex<VecDeque<Vec<GapRecord>>>>,
    config: &GapWriterConfig,
    metrics: &Arc<GapWriterMetrics>,
) {
    let batch = {
        let mut retries = retry_queue.lock().await;
        let batch = retries.pop_front();
        metrics.retry_queue_size.store(retries.len() as u64, Ordering::Relaxed);
        batch
    };
    let Some(batch) = batch else { return };

    if !save_with_retries(store, &batch, config, metrics).await {
        let mut retries = retry_queue.lock().await;
        if retries.len() >= config.max_retry_queue_size {
            let overflowed = retries.pop_front();
            metrics.dropped_count.fetch_add(1, Ordering::Relaxed);
            if let Some(overflowed) = overflowed {
                spill_to_queue(queue_store, overflowed);
            }
        }
        retries.push_back(batch);
        metrics.retry_queue_size.store(retries.len() as u64, Ordering::Relaxed);
    }
}

/// Attempts `gap_save_batch` with the in-batch retry delays from spec.md §4.7.
/// `config.batch_max_retries` retries follow the first attempt, each delayed by
/// `config.batch_retry_delays_ms[attempt - 1]` (the last entry repeats if the
/// delay list is shorter than the retry count).
async fn save_with_retries(store: &Arc<dyn GapStore>, batch: &[GapRecord], config: &GapWriterConfig, metrics: &Arc<GapWriterMetrics>) -> bool {
    for attempt in 0..=config.batch_max_retries {
        if attempt > 0 {
            let delay_ms = config
                .batch_retry_delays_ms
                .get(attempt - 1)
                .or_else(|| config.batch_retry_delays_ms.last())
                .copied()
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        match store.gap_save_batch(batch.to_vec()).await {
            Ok(_) => {
                metrics.processed_count.fetch_add(batch.len() as u64, Ordering::Relaxed);
                return true;
            }
            Err(e) => {
                warn!("gap batch save failed (attempt {attempt}): {e}");
            }
        }
    }
    metrics.failed_count.fetch_add(batch.len() as u64, Ordering::Relaxed);
    false
}
