//! Worker-side typed clients — wrap `IpcClient` and implement the domain
//! `StateStore`/`GapStore` ports so the worker runtime talks to the persistence
//! server through the same trait seam it would use for an in-process store.

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::market::gap::{GapFilter, GapRecord};
use crate::domain::ports::{GapStore, QueueStore, StateStore};
use crate::infrastructure::ipc::client::IpcClient;
use crate::infrastructure::ipc::envelope::RequestFamily;
use async_trait::async_trait;
use std::sync::Arc;

fn response_data(response: crate::infrastructure::ipc::envelope::Response) -> EngineResult<serde_json::Value> {
    if response.success {
        Ok(response.data.unwrap_or(serde_json::Value::Null))
    } else {
        Err(EngineError::Protocol(response.error.unwrap_or_else(|| "unknown persistence error".to_string())))
    }
}

pub struct StateStoreClient {
    client: Arc<IpcClient>,
}

impl StateStoreClient {
    pub fn new(client: Arc<IpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StateStore for StateStoreClient {
    async fn save(&self, exchange: &str, symbol: &str, state_json: &str) -> EngineResult<()> {
        let payload = serde_json::json!({"op": "save", "exchange": exchange, "symbol": symbol, "state_json": state_json});
        response_data(self.client.send_request(RequestFamily::State, payload, None).await?)?;
        Ok(())
    }

    async fn save_batch(&self, states: Vec<(String, String, String)>) -> EngineResult<()> {
        let payload = serde_json::json!({"op": "save_batch", "states": states});
        response_data(self.client.send_request(RequestFamily::State, payload, None).await?)?;
        Ok(())
    }

    async fn load(&self, exchange: &str, symbol: &str) -> EngineResult<Option<String>> {
        let payload = serde_json::json!({"op": "load", "exchange": exchange, "symbol": symbol});
        let data = response_data(self.client.send_request(RequestFamily::State, payload, None).await?)?;
        Ok(data.get("stateJson").and_then(|v| v.as_str()).map(str::to_string))
    }

    async fn load_batch(&self, exchange: &str, symbols: Vec<String>) -> EngineResult<Vec<(String, String)>> {
        let payload = serde_json::json!({"op": "load_batch", "exchange": exchange, "symbols": symbols});
        let data = response_data(self.client.send_request(RequestFamily::State, payload, None).await?)?;
        let states = data.get("states").cloned().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(states).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    async fn load_all(&self) -> EngineResult<Vec<(String, String, String)>> {
        let payload = serde_json::json!({"op": "load_all"});
        let data = response_data(self.client.send_request(RequestFamily::State, payload, None).await?)?;
        let states = data.get("states").cloned().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(states).map_err(|e| EngineError::Protocol(e.to_string()))
    }
}

pub struct GapStoreClient {
    client: Arc<IpcClient>,
}

impl GapStoreClient {
    pub fn new(client: Arc<IpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GapStore for GapStoreClient {
    async fn gap_save(&self, gap: GapRecord) -> EngineResult<GapRecord> {
        let payload = serde_json::json!({"op": "save", "gap": gap});
        let data = response_data(self.client.send_request(RequestFamily::Gap, payload, None).await?)?;
        serde_json::from_value(data.get("gap").cloned().unwrap_or(serde_json::Value::Null)).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    async fn gap_save_batch(&self, gaps: Vec<GapRecord>) -> EngineResult<Vec<GapRecord>> {
        let payload = serde_json::json!({"op": "save_batch", "gaps": gaps});
        let data = response_data(self.client.send_request(RequestFamily::Gap, payload, None).await?)?;
        serde_json::from_value(data.get("gaps").cloned().unwrap_or(serde_json::Value::Null)).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    async fn gap_load(&self, filter: GapFilter) -> EngineResult<Vec<GapRecord>> {
        let payload = serde_json::json!({"op": "load", "filter": filter});
        let data = response_data(self.client.send_request(RequestFamily::Gap, payload, None).await?)?;
        serde_json::from_value(data.get("gaps").cloned().unwrap_or(serde_json::Value::Null)).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    async fn gap_mark_synced(&self, ids: Vec<i64>) -> EngineResult<usize> {
        let payload = serde_json::json!({"op": "mark_synced", "ids": ids});
        let data = response_data(self.client.send_request(RequestFamily::Gap, payload, None).await?)?;
        Ok(data.get("updated").and_then(|v| v.as_u64()).unwrap_or(0) as usize)
    }
}

pub struct QueueStoreClient {
    client: Arc<IpcClient>,
}

impl QueueStoreClient {
    pub fn new(client: Arc<IpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueueStore for QueueStoreClient {
    async fn enqueue(&self, message_type: &str, payload: serde_json::Value) -> EngineResult<()> {
        let envelope = serde_json::json!({"message_type": message_type, "payload": payload});
        response_data(self.client.send_request(RequestFamily::Queue, envelope, None).await?)?;
        Ok(())
    }
}
