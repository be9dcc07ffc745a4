//! Pool — spawns worker runtimes, waits for readiness, and routes trades to the
//! worker each symbol consistently hashes to (spec.md §4.6). Grounded on the
//! teacher's `Application::build`/`start` composition root plus `oneshot`
//! request/response to a single mailbox.

use crate::application::gap_writer::GapWriterHandle;
use crate::application::router::hash_ring;
use crate::application::worker_runtime::{Worker, WorkerHandle};
use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::market::trade::Trade;
use crate::domain::ports::{EventSink, StateStore, SymbolConfigSource};
use crate::domain::worker::PoolHealthSnapshot;
use crate::infrastructure::observability::EngineMetrics;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub struct PoolConfig {
    pub worker_count: usize,
    pub ready_timeout: Duration,
    pub flush_interval: Duration,
    pub mailbox_capacity: usize,
}

pub struct Pool {
    workers: Vec<WorkerHandle>,
    assignments: Mutex<HashMap<String, usize>>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl Pool {
    /// Spawns `config.worker_count` workers and blocks up to `ready_timeout` for
    /// every one to signal ready via `WORKER_INIT` with its assigned symbols.
    #[allow(clippy::too_many_arguments)]
    pub async fn start(
        config: PoolConfig,
        exchange: String,
        state_store_factory: impl Fn(usize) -> Arc<dyn StateStore>,
        gap_writer: GapWriterHandle,
        symbol_config_source: Arc<dyn SymbolConfigSource>,
        event_sink: Arc<dyn EventSink>,
        symbols: Vec<String>,
        metrics: Option<Arc<EngineMetrics>>,
    ) -> EngineResult<Self> {
        let mut workers = Vec::with_capacity(config.worker_count);
        for id in 0..config.worker_count {
            let handle = Worker::spawn(
                id,
                exchange.clone(),
                state_store_factory(id),
                gap_writer.clone(),
                symbol_config_source.clone(),
                event_sink.clone(),
                config.flush_interval,
                config.mailbox_capacity,
                metrics.clone(),
            );
            workers.push(handle);
        }

        let mut assignments = HashMap::with_capacity(symbols.len());
        let mut per_worker: Vec<Vec<String>> = vec![Vec::new(); workers.len()];
        for symbol in symbols {
            let idx = hash_ring::assign(&symbol, workers.len());
            per_worker[idx].push(symbol.clone());
            assignments.insert(symbol, idx);
        }

        let init = async {
            for (worker, owned_symbols) in workers.iter().zip(per_worker.into_iter()) {
                worker.init(owned_symbols).await;
            }
        };
        tokio::time::timeout(config.ready_timeout, init)
            .await
            .map_err(|_| EngineError::Timeout(config.ready_timeout.as_millis() as u64))?;

        info!("pool started with {} worker(s)", workers.len());
        Ok(Self { workers, assignments: Mutex::new(assignments), metrics })
    }

    /// `routeTrades` — enqueues onto the owning worker's mailbox. Per-symbol
    /// ordering is preserved by the mailbox; cross-symbol ordering is not.
    pub async fn route_trade(&self, trade: Trade) {
        let idx = self.worker_for(&trade.symbol);
        if let Err(e) = self.workers[idx].route(trade).await {
            warn!("pool: failed to route trade to worker {idx}: {e}");
        }
    }

    pub fn assign_symbol_to_worker(&self, symbol: &str, worker_id: Option<usize>) {
        let idx = worker_id.unwrap_or_else(|| hash_ring::assign(symbol, self.workers.len()));
        self.assignments.lock().expect("assignments mutex poisoned").insert(symbol.to_string(), idx);
    }

    pub fn remove_symbol_from_worker(&self, symbol: &str) {
        self.assignments.lock().expect("assignments mutex poisoned").remove(symbol);
    }

    fn worker_for(&self, symbol: &str) -> usize {
        self.assignments
            .lock()
            .expect("assignments mutex poisoned")
            .get(symbol)
            .copied()
            .unwrap_or_else(|| hash_ring::assign(symbol, self.workers.len()))
    }

    /// `broadcastToAll` — fan out a health request and collect every worker's
    /// response.
    pub async fn health(&self) -> PoolHealthSnapshot {
        let mut snapshot = PoolHealthSnapshot { worker_count: self.workers.len(), ..Default::default() };
        for worker in &self.workers {
            match worker.sync_metrics().await {
                Some(health) => snapshot.workers.push((worker.id, health)),
                None => snapshot.unhealthy_workers.push(worker.id),
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.set_pool_health(snapshot.worker_count, snapshot.unhealthy_workers.len());
        }
        snapshot
    }

    /// Shutdown: flush every worker (bounded by `timeout`). Takes `&self` so the
    /// pool can be shared (e.g. `Arc<Pool>`) with the task that routes trades into
    /// it; each worker's mailbox is closed separately when its `WorkerHandle` is
    /// finally dropped.
    ///
    /// Returns `true` if `timeout` elapsed before every worker finished flushing
    /// (correctness-with-loss per spec.md §7: the orchestrator proceeds rather
    /// than block indefinitely).
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let flush_all = async {
            for worker in &self.workers {
                worker.shutdown().await;
            }
        };
        let timed_out = tokio::time::timeout(timeout, flush_all).await.is_err();
        if timed_out {
            warn!("pool shutdown timed out after {:?}", timeout);
        }
        timed_out
    }
}
