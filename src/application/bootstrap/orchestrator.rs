//! Orchestrator — ordered startup/shutdown across the persistence server, the
//! gap writer, the worker pool, and trade ingestion (spec.md §2, §4.9).
//!
//! Grounded on the teacher's `Application::build`/`start` composition root and
//! `SystemHandle` (`src/application/system.rs`): explicit constructor injection,
//! no DI container (spec.md §9), a `build` step that wires dependencies and a
//! `start` step that brings the system up, returning a handle the caller uses to
//! drive shutdown.

use crate::application::gap_writer::{self, GapWriterHandle};
use crate::application::router::pool::{Pool, PoolConfig};
use crate::config::Config;
use crate::domain::market::symbol_config::SymbolConfig;
use crate::domain::market::trade::Trade;
use crate::domain::ports::{EventSink, StateStore};
use crate::infrastructure::adapters::{BroadcastEventSink, ChannelTradeSource, InMemorySymbolConfigSource};
use crate::infrastructure::ipc::client::IpcClient;
use crate::infrastructure::ipc_adapters::{GapStoreClient, QueueStoreClient, StateStoreClient};
use crate::infrastructure::observability::EngineMetrics;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::queue_repository::{LoggingQueueRoutingHandler, QueuePoller};
use crate::infrastructure::persistence::server as persistence_server;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// Assembled but not yet running. `build` opens the database and nothing else —
/// no sockets are bound and no workers spawned until `start`.
pub struct Orchestrator {
    config: Config,
    database: Database,
}

/// Returned by `OrchestratorHandle::shutdown` — what did and didn't finish
/// within `shutdownFlushTimeoutMs` (spec.md §7: correctness-with-loss is
/// preferred over blocking indefinitely).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShutdownReport {
    pub pool_flush_timed_out: bool,
}

/// The running system. Push trades in through `trade_sender()`; subscribe to
/// completed candles through `event_sink()`.
pub struct OrchestratorHandle {
    pool: Arc<Pool>,
    gap_writer: GapWriterHandle,
    event_sink: Arc<BroadcastEventSink>,
    symbol_config_source: Arc<InMemorySymbolConfigSource>,
    trade_tx: mpsc::Sender<Trade>,
    trade_ingest_task: tokio::task::JoinHandle<()>,
    persistence_task: tokio::task::JoinHandle<()>,
    persistence_shutdown: oneshot::Sender<()>,
    queue_poller_task: tokio::task::JoinHandle<()>,
    queue_poller_shutdown: oneshot::Sender<()>,
    metrics_task: Option<tokio::task::JoinHandle<()>>,
    metrics_shutdown: Option<oneshot::Sender<()>>,
    metrics: Option<Arc<EngineMetrics>>,
    shutdown_flush_timeout: Duration,
}

impl Orchestrator {
    /// Opens (and initializes the schema of) the embedded store. Does not bind
    /// the IPC socket or spawn any workers yet.
    pub async fn build(config: Config) -> Result<Self> {
        let database = Database::new(&config.engine.database_url).await.context("failed to open persistence database")?;
        Ok(Self { config, database })
    }

    /// Starts the persistence server, connects the gap writer and every
    /// worker's IPC client, waits on the pool's readiness barrier, then begins
    /// routing trades. `symbols` seeds the in-memory `SymbolConfigSource` and
    /// the initial symbol→worker assignment.
    pub async fn start(self, symbols: Vec<SymbolConfig>) -> Result<OrchestratorHandle> {
        let Self { config, database } = self;
        let engine = &config.engine;

        let queue_poller_database = database.clone();
        let server = persistence_server::build(database, engine.socket_path.clone(), engine.max_connections);
        let (persistence_shutdown, persistence_shutdown_rx) = oneshot::channel();
        let persistence_task = tokio::spawn(async move {
            if let Err(e) = server.serve(persistence_shutdown_rx).await {
                tracing::error!("persistence server stopped: {e}");
            }
        });

        let (queue_poller_shutdown, queue_poller_shutdown_rx) = oneshot::channel();
        let queue_poller_task = tokio::spawn(
            QueuePoller::new(
                queue_poller_database,
                config.queue.poll_interval,
                config.queue.retention,
                config.queue.batch_size,
                Arc::new(LoggingQueueRoutingHandler),
            )
            .run(queue_poller_shutdown_rx),
        );

        // Every worker gets its own connection (spec.md §4.8: "one IPC client to
        // the persistence server"); `IpcClient::connect`'s own retry/backoff
        // absorbs the race against the listener binding above.
        let mut state_stores: Vec<Arc<dyn StateStore>> = Vec::with_capacity(engine.worker_count);
        for _ in 0..engine.worker_count {
            let client = IpcClient::connect(&engine.socket_path, &config.ipc_client)
                .await
                .context("worker failed to connect to persistence server")?;
            state_stores.push(Arc::new(StateStoreClient::new(client)));
        }

        let gap_client = IpcClient::connect(&engine.socket_path, &config.ipc_client)
            .await
            .context("gap writer failed to connect to persistence server")?;
        let gap_store = Arc::new(GapStoreClient::new(gap_client));

        // Gives the gap writer a queue-family fallback so a batch it permanently
        // drops (retry queue full) still reaches persistence instead of vanishing
        // (spec.md §4.2).
        let queue_client = IpcClient::connect(&engine.socket_path, &config.ipc_client)
            .await
            .context("gap writer failed to connect to persistence server for queue fallback")?;
        let queue_store = Arc::new(QueueStoreClient::new(queue_client));

        let gap_writer = gap_writer::spawn(gap_store, Some(queue_store), config.gap_writer.clone());

        let event_sink = Arc::new(BroadcastEventSink::new(4096));
        let symbol_config_source = Arc::new(InMemorySymbolConfigSource::new(symbols.clone()));

        let metrics = if config.observability.enabled {
            Some(Arc::new(EngineMetrics::new().context("failed to construct engine metrics")?))
        } else {
            None
        };

        let pool_config = PoolConfig {
            worker_count: engine.worker_count,
            ready_timeout: engine.ready_timeout,
            flush_interval: engine.dirty_flush_interval,
            mailbox_capacity: engine.mailbox_capacity,
        };
        let pool = Pool::start(
            pool_config,
            engine.exchange.clone(),
            move |id| state_stores[id].clone(),
            gap_writer.clone(),
            symbol_config_source.clone(),
            event_sink.clone() as Arc<dyn EventSink>,
            symbols.into_iter().map(|c| c.symbol).collect(),
            metrics.clone(),
        )
        .await
        .map_err(|e| anyhow::anyhow!("pool failed to start: {e}"))?;
        let pool = Arc::new(pool);

        // Push-based metrics only (spec.md §1 Non-goals exclude REST/HTTP
        // controllers): periodically fold the gap writer's atomic counters into
        // the registry and log a snapshot, rather than expose a scrape endpoint.
        let (metrics_task, metrics_shutdown) = metrics.clone().map_or((None, None), |metrics| {
            let exchange = engine.exchange.clone();
            let gap_writer_for_metrics = gap_writer.clone();
            let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
            let task = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(10));
                let mut last_processed = 0u64;
                let mut last_dropped = 0u64;
                let mut last_failed = 0u64;
                loop {
                    tokio::select! {
                        _ = &mut shutdown_rx => break,
                        _ = ticker.tick() => {
                            let snapshot = gap_writer_for_metrics.metrics();
                            metrics.sync_gap_writer(
                                &exchange,
                                snapshot.queue_size,
                                snapshot.retry_queue_size,
                                snapshot.processed_count.saturating_sub(last_processed),
                                snapshot.dropped_count.saturating_sub(last_dropped),
                                snapshot.failed_count.saturating_sub(last_failed),
                            );
                            last_processed = snapshot.processed_count;
                            last_dropped = snapshot.dropped_count;
                            last_failed = snapshot.failed_count;
                            debug!("metrics snapshot:\n{}", metrics.render());
                        }
                    }
                }
            });
            (Some(task), Some(shutdown_tx))
        });

        let (trade_tx, mut trade_source) = ChannelTradeSource::new(engine.mailbox_capacity);
        let ingest_pool = pool.clone();
        let trade_ingest_task = tokio::spawn(async move {
            while let Some(trade) = crate::domain::ports::TradeSource::next(&mut trade_source).await {
                ingest_pool.route_trade(trade).await;
            }
        });

        info!("orchestrator started: {} worker(s), socket {}", engine.worker_count, engine.socket_path);

        Ok(OrchestratorHandle {
            pool,
            gap_writer,
            event_sink,
            symbol_config_source,
            trade_tx,
            trade_ingest_task,
            persistence_task,
            persistence_shutdown,
            queue_poller_task,
            queue_poller_shutdown,
            metrics_task,
            metrics_shutdown,
            metrics,
            shutdown_flush_timeout: engine.shutdown_flush_timeout,
        })
    }
}

impl OrchestratorHandle {
    /// The sender side of the ingestion channel — external trade sources (out
    /// of core, spec.md §1) push through this.
    pub fn trade_sender(&self) -> mpsc::Sender<Trade> {
        self.trade_tx.clone()
    }

    pub fn event_sink(&self) -> Arc<BroadcastEventSink> {
        self.event_sink.clone()
    }

    pub fn symbol_config_source(&self) -> Arc<InMemorySymbolConfigSource> {
        self.symbol_config_source.clone()
    }

    pub fn gap_writer(&self) -> GapWriterHandle {
        self.gap_writer.clone()
    }

    pub fn metrics(&self) -> Option<Arc<EngineMetrics>> {
        self.metrics.clone()
    }

    pub async fn health(&self) -> crate::domain::worker::PoolHealthSnapshot {
        self.pool.health().await
    }

    /// Reverse of `Orchestrator::start`: stop ingesting, flush the pool
    /// (bounded by `shutdownFlushTimeoutMs`), drain the gap writer, then stop the
    /// persistence server and queue poller.
    pub async fn shutdown(self, timeout: Duration) -> ShutdownReport {
        let effective_timeout = timeout.min(self.shutdown_flush_timeout);
        drop(self.trade_tx);
        self.trade_ingest_task.abort();
        let _ = self.trade_ingest_task.await;

        let pool_flush_timed_out = self.pool.shutdown(effective_timeout).await;
        self.gap_writer.flush_all(effective_timeout).await;
        self.gap_writer.shutdown().await;

        let _ = self.queue_poller_shutdown.send(());
        let _ = tokio::time::timeout(effective_timeout, self.queue_poller_task).await;

        if let Some(metrics_shutdown) = self.metrics_shutdown {
            let _ = metrics_shutdown.send(());
        }
        if let Some(metrics_task) = self.metrics_task {
            let _ = tokio::time::timeout(effective_timeout, metrics_task).await;
        }

        let _ = self.persistence_shutdown.send(());
        let _ = tokio::time::timeout(effective_timeout, self.persistence_task).await;

        ShutdownReport { pool_flush_timed_out }
    }
}
