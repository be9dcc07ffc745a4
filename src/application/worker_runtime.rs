//! Worker — one single-threaded cooperative mailbox loop over routed trades and
//! control messages (spec.md §4.8). Grounded on `MarketScanner::run`'s
//! `tokio::select! { heartbeat_interval.tick() => ..., mailbox.recv() => ... }`
//! shape, generalized to a dirty-tracked candle store plus a persistence flush.

use crate::application::gap_writer::GapWriterHandle;
use crate::application::processor::{process_trade, ProcessOutcome};
use crate::domain::market::candle_group::CandleGroup;
use crate::domain::market::trade::Trade;
use crate::domain::ports::{EventSink, StateStore, SymbolConfigSource};
use crate::domain::worker::{WorkerHealthSnapshot, WorkerState, WorkerThread};
use crate::infrastructure::observability::EngineMetrics;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

pub enum WorkerMessage {
    Trade(Trade),
    Init { assigned_symbols: Vec<String>, reply: oneshot::Sender<()> },
    Shutdown { reply: oneshot::Sender<()> },
    SyncMetrics { reply: oneshot::Sender<WorkerHealthSnapshot> },
}

pub struct WorkerHandle {
    pub id: usize,
    pub mailbox: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    /// `routeTrades` for this worker — ordering within the symbol is preserved by
    /// the channel; this never blocks longer than the mailbox's backpressure.
    pub async fn route(&self, trade: Trade) -> Result<(), mpsc::error::SendError<WorkerMessage>> {
        self.mailbox.send(WorkerMessage::Trade(trade)).await
    }

    pub async fn init(&self, assigned_symbols: Vec<String>) {
        let (reply, rx) = oneshot::channel();
        if self.mailbox.send(WorkerMessage::Init { assigned_symbols, reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.mailbox.send(WorkerMessage::Shutdown { reply }).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub async fn sync_metrics(&self) -> Option<WorkerHealthSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.mailbox.send(WorkerMessage::SyncMetrics { reply }).await.ok()?;
        rx.await.ok()
    }
}

pub struct Worker {
    id: usize,
    exchange: String,
    mailbox: mpsc::Receiver<WorkerMessage>,
    state_store: Arc<dyn StateStore>,
    gap_writer: GapWriterHandle,
    symbol_config_source: Arc<dyn SymbolConfigSource>,
    event_sink: Arc<dyn EventSink>,
    storage: HashMap<String, CandleGroup>,
    dirty: HashSet<String>,
    thread: WorkerThread,
    flush_interval: Duration,
    metrics: Option<Arc<EngineMetrics>>,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        id: usize,
        exchange: String,
        state_store: Arc<dyn StateStore>,
        gap_writer: GapWriterHandle,
        symbol_config_source: Arc<dyn SymbolConfigSource>,
        event_sink: Arc<dyn EventSink>,
        flush_interval: Duration,
        mailbox_capacity: usize,
        metrics: Option<Arc<EngineMetrics>>,
    ) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(mailbox_capacity);
        let worker = Self {
            id,
            exchange,
            mailbox: rx,
            state_store,
            gap_writer,
            symbol_config_source,
            event_sink,
            storage: HashMap::new(),
            dirty: HashSet::new(),
            thread: WorkerThread::new(id),
            flush_interval,
            metrics,
        };
        tokio::spawn(worker.run());
        WorkerHandle { id, mailbox: tx }
    }

    async fn run(mut self) {
        let mut flush_ticker = tokio::time::interval(self.flush_interval);

        loop {
            tokio::select! {
                msg = self.mailbox.recv() => {
                    match msg {
                        Some(WorkerMessage::Trade(trade)) => self.handle_trade(trade).await,
                        Some(WorkerMessage::Init { assigned_symbols, reply }) => {
                            self.handle_init(assigned_symbols).await;
                            let _ = reply.send(());
                        }
                        Some(WorkerMessage::Shutdown { reply }) => {
                            self.flush_dirty().await;
                            self.gap_writer.flush_all(Duration::from_secs(5)).await;
                            self.thread.state = WorkerState::Terminated;
                            let _ = reply.send(());
                            info!("worker {} shut down", self.id);
                            break;
                        }
                        Some(WorkerMessage::SyncMetrics { reply }) => {
                            let _ = reply.send(self.thread.health.clone());
                        }
                        None => break,
                    }
                }
                _ = flush_ticker.tick() => {
                    self.flush_dirty().await;
                }
            }
        }
    }

    async fn handle_init(&mut self, assigned_symbols: Vec<String>) {
        for symbol in &assigned_symbols {
            match self.state_store.load(&self.exchange, symbol).await {
                Ok(Some(state_json)) => match serde_json::from_str::<CandleGroup>(&state_json) {
                    Ok(group) => {
                        self.storage.insert(symbol.clone(), group);
                    }
                    Err(e) => error!("worker {}: failed to decode saved state for {symbol}: {e}", self.id),
                },
                Ok(None) => {}
                Err(e) => error!("worker {}: failed to load state for {symbol}: {e}", self.id),
            }
        }
        self.thread.assigned_symbols = assigned_symbols.into_iter().collect();
        self.dirty.clear();
        self.thread.mark_ready();
        info!("worker {} ready with {} symbol(s)", self.id, self.thread.assigned_symbols.len());
    }

    async fn handle_trade(&mut self, trade: Trade) {
        let started = std::time::Instant::now();

        let Some(config) = self.symbol_config_source.get(&trade.symbol).await else {
            warn!("worker {}: no symbol config for {}, dropping trade", self.id, trade.symbol);
            return;
        };

        let now = chrono::Utc::now().timestamp_millis();
        let group = self
            .storage
            .entry(trade.symbol.clone())
            .or_insert_with(|| CandleGroup::new_default(&self.exchange, &trade.symbol, &config, trade.timestamp));

        let ProcessOutcome { completed, gap_detected, skipped: _ } = process_trade(group, &trade, &config, now);
        self.dirty.insert(trade.symbol.clone());

        if let Some(gap) = gap_detected {
            self.gap_writer.submit(gap);
        }

        for (timeframe, candle) in completed {
            self.event_sink.publish(&self.exchange, &trade.symbol, timeframe.name(), candle);
            self.thread.health.events_published += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_event_published(self.id);
            }
        }

        let processing_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.thread.record_trade(processing_ms, now);
        if let Some(metrics) = &self.metrics {
            metrics.record_trade(self.id, processing_ms);
        }
    }

    async fn flush_dirty(&mut self) {
        if self.dirty.is_empty() {
            return;
        }

        let mut batch = Vec::with_capacity(self.dirty.len());
        for symbol in &self.dirty {
            let Some(group) = self.storage.get(symbol) else { continue };
            match serde_json::to_string(group) {
                Ok(state_json) => batch.push((self.exchange.clone(), symbol.clone(), state_json)),
                Err(e) => error!("worker {}: failed to encode state for {symbol}: {e}", self.id),
            }
        }

        match self.state_store.save_batch(batch).await {
            Ok(()) => self.dirty.clear(),
            Err(e) => {
                error!("worker {}: save_batch failed, keeping dirty flags: {e}", self.id);
                self.thread.record_error(e.to_string());
                if let Some(metrics) = &self.metrics {
                    metrics.record_worker_error(self.id);
                }
            }
        }
    }
}
