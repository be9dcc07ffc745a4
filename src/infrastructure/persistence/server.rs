//! Wires the three `RequestHandler`s (state/gap/queue) onto an `IpcServer`
//! socket backed by the SQLite stores in this module (spec.md §4.2).

use crate::domain::errors::EngineError;
use crate::domain::market::gap::{GapFilter, GapRecord};
use crate::domain::ports::{GapStore, QueueStore, StateStore};
use crate::infrastructure::ipc::envelope::RequestFamily;
use crate::infrastructure::ipc::server::{IpcServer, IpcServerConfig, RequestHandler};
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::gap_repository::SqliteGapStore;
use crate::infrastructure::persistence::queue_repository::SqliteQueueStore;
use crate::infrastructure::persistence::state_repository::SqliteStateStore;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

struct StateHandler {
    store: SqliteStateStore,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum StateRequest {
    Save { exchange: String, symbol: String, state_json: String },
    SaveBatch { states: Vec<(String, String, String)> },
    Load { exchange: String, symbol: String },
    LoadBatch { exchange: String, symbols: Vec<String> },
    LoadAll,
}

#[async_trait]
impl RequestHandler for StateHandler {
    async fn handle(&self, payload: serde_json::Value) -> Result<serde_json::Value, EngineError> {
        let request: StateRequest = serde_json::from_value(payload).map_err(|e| EngineError::Protocol(e.to_string()))?;
        let data = match request {
            StateRequest::Save { exchange, symbol, state_json } => {
                self.store.save(&exchange, &symbol, &state_json).await?;
                serde_json::json!({"saved": true})
            }
            StateRequest::SaveBatch { states } => {
                self.store.save_batch(states).await?;
                serde_json::json!({"saved": true})
            }
            StateRequest::Load { exchange, symbol } => {
                serde_json::json!({"stateJson": self.store.load(&exchange, &symbol).await?})
            }
            StateRequest::LoadBatch { exchange, symbols } => {
                serde_json::json!({"states": self.store.load_batch(&exchange, symbols).await?})
            }
            StateRequest::LoadAll => {
                serde_json::json!({"states": self.store.load_all().await?})
            }
        };
        Ok(data)
    }
}

struct GapHandler {
    store: SqliteGapStore,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum GapRequest {
    Save { gap: GapRecord },
    SaveBatch { gaps: Vec<GapRecord> },
    Load { filter: GapFilter },
    MarkSynced { ids: Vec<i64> },
}

#[async_trait]
impl RequestHandler for GapHandler {
    async fn handle(&self, payload: serde_json::Value) -> Result<serde_json::Value, EngineError> {
        let request: GapRequest = serde_json::from_value(payload).map_err(|e| EngineError::Protocol(e.to_string()))?;
        let data = match request {
            GapRequest::Save { gap } => serde_json::json!({"gap": self.store.gap_save(gap).await?}),
            GapRequest::SaveBatch { gaps } => serde_json::json!({"gaps": self.store.gap_save_batch(gaps).await?}),
            GapRequest::Load { filter } => serde_json::json!({"gaps": self.store.gap_load(filter).await?}),
            GapRequest::MarkSynced { ids } => serde_json::json!({"updated": self.store.gap_mark_synced(ids).await?}),
        };
        Ok(data)
    }
}

struct QueueHandler {
    store: SqliteQueueStore,
}

#[derive(Deserialize)]
struct QueueRequest {
    message_type: String,
    payload: serde_json::Value,
}

#[async_trait]
impl RequestHandler for QueueHandler {
    async fn handle(&self, payload: serde_json::Value) -> Result<serde_json::Value, EngineError> {
        let request: QueueRequest = serde_json::from_value(payload).map_err(|e| EngineError::Protocol(e.to_string()))?;
        self.store.enqueue(&request.message_type, request.payload).await?;
        Ok(serde_json::json!({"enqueued": true}))
    }
}

/// Assembles the persistence server's `IpcServer` with all three handlers bound
/// to one shared `Database`.
pub fn build(database: Database, socket_path: String, max_connections: usize) -> IpcServer {
    IpcServer::new(IpcServerConfig { socket_path, max_connections })
        .register(RequestFamily::State, Arc::new(StateHandler { store: SqliteStateStore::new(database.clone()) }))
        .register(RequestFamily::Gap, Arc::new(GapHandler { store: SqliteGapStore::new(database.clone()) }))
        .register(RequestFamily::Queue, Arc::new(QueueHandler { store: SqliteQueueStore::new(database) }))
}
