//! `QueueStore` adapter over the `queue_items` table (spec.md §4.2) — the
//! fire-and-forget fallback channel for messages the caller does not wait on.
//! Grounded on the teacher's `ReoptimizationTriggerRepository`
//! insert-then-poll-by-status shape
//! (`src/infrastructure/persistence/repositories/reoptimization_trigger_repository.rs`).

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::ports::QueueStore;
use crate::infrastructure::persistence::database::Database;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct SqliteQueueStore {
    database: Database,
}

impl SqliteQueueStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn enqueue(&self, message_type: &str, payload: serde_json::Value) -> EngineResult<()> {
        let payload_json = serde_json::to_string(&payload).map_err(|e| EngineError::Storage(e.to_string()))?;
        let now = chrono::Utc::now().timestamp_millis();

        sqlx::query("INSERT INTO queue_items (queue_name, payload_json, enqueued_at) VALUES ($1, $2, $3)")
            .bind(message_type)
            .bind(payload_json)
            .bind(now)
            .execute(&self.database.pool)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?;

        Ok(())
    }
}

/// One unprocessed row pulled off `queue_items` for dispatch.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: i64,
    pub queue_name: String,
    pub payload: serde_json::Value,
}

/// Routes a dequeued queue item to whatever fallback channel it names.
/// Implementations live outside this module — the poller only knows how to
/// pull batches and mark them processed (spec.md §4.2).
#[async_trait]
pub trait QueueRoutingHandler: Send + Sync {
    async fn route(&self, item: &QueueItem);
}

/// A routing handler that only logs — the default when no fallback consumer
/// is wired in (spec.md §9: the symbol-sync/admin workflows this channel
/// ultimately feeds are out of core).
pub struct LoggingQueueRoutingHandler;

#[async_trait]
impl QueueRoutingHandler for LoggingQueueRoutingHandler {
    async fn route(&self, item: &QueueItem) {
        debug!("queue poller: routed item {} (queue={})", item.id, item.queue_name);
    }
}

/// Periodically pulls up to `batch_size` unprocessed rows, dispatches each to
/// `handler`, marks the dispatched ids processed, and prunes rows past
/// `retention`. Runs as a background task owned by the persistence server,
/// mirroring the worker's own interval-driven flush loop
/// (`application/worker_runtime.rs`).
pub struct QueuePoller {
    database: Database,
    poll_interval: Duration,
    retention: Duration,
    batch_size: usize,
    handler: Arc<dyn QueueRoutingHandler>,
}

impl QueuePoller {
    pub fn new(database: Database, poll_interval: Duration, retention: Duration, batch_size: usize, handler: Arc<dyn QueueRoutingHandler>) -> Self {
        Self { database, poll_interval, retention, batch_size, handler }
    }

    pub async fn run(self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("queue poller shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_and_prune().await {
                        warn!("queue poller pass failed: {e}");
                    }
                }
            }
        }
    }

    async fn drain_and_prune(&self) -> EngineResult<()> {
        let rows: Vec<(i64, String, String)> = sqlx::query_as(
            "SELECT id, queue_name, payload_json FROM queue_items WHERE processed = 0 ORDER BY enqueued_at ASC LIMIT $1",
        )
        .bind(self.batch_size as i64)
        .fetch_all(&self.database.pool)
        .await
        .map_err(|e| EngineError::Storage(e.to_string()))?;

        if !rows.is_empty() {
            let mut dispatched_ids = Vec::with_capacity(rows.len());
            for (id, queue_name, payload_json) in rows {
                let payload = serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null);
                self.handler.route(&QueueItem { id, queue_name, payload }).await;
                dispatched_ids.push(id);
            }

            let placeholders = dispatched_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let query = format!("UPDATE queue_items SET processed = 1 WHERE id IN ({placeholders})");
            let mut q = sqlx::query(&query);
            for id in &dispatched_ids {
                q = q.bind(id);
            }
            q.execute(&self.database.pool).await.map_err(|e| EngineError::Storage(e.to_string()))?;
            debug!("queue poller dispatched and marked {} item(s) processed", dispatched_ids.len());
        }

        let cutoff = chrono::Utc::now().timestamp_millis() - self.retention.as_millis() as i64;
        let pruned = sqlx::query("DELETE FROM queue_items WHERE processed = 1 AND enqueued_at < $1")
            .bind(cutoff)
            .execute(&self.database.pool)
            .await
            .map_err(|e| EngineError::Storage(e.to_string()))?
            .rows_affected();
        if pruned > 0 {
            debug!("queue poller pruned {pruned} retired item(s)");
        }

        Ok(())
    }
}
