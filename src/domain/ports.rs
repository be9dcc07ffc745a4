//! Ports — the trait seams between the engine core and its collaborators, in the
//! teacher's `#[async_trait] pub trait Foo: Send + Sync` style (`src/domain/ports.rs`).

use crate::domain::errors::EngineResult;
use crate::domain::market::footprint_candle::FootprintCandle;
use crate::domain::market::gap::{GapFilter, GapRecord};
use crate::domain::market::symbol_config::SymbolConfig;
use crate::domain::market::trade::Trade;
use async_trait::async_trait;

/// State family — persists/retrieves the latest serialized `CandleGroup` per
/// `(exchange, symbol)` (spec.md §4.2).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, exchange: &str, symbol: &str, state_json: &str) -> EngineResult<()>;
    async fn save_batch(&self, states: Vec<(String, String, String)>) -> EngineResult<()>;
    async fn load(&self, exchange: &str, symbol: &str) -> EngineResult<Option<String>>;
    async fn load_batch(&self, exchange: &str, symbols: Vec<String>) -> EngineResult<Vec<(String, String)>>;
    async fn load_all(&self) -> EngineResult<Vec<(String, String, String)>>;
}

/// Gap family (spec.md §4.2).
#[async_trait]
pub trait GapStore: Send + Sync {
    async fn gap_save(&self, gap: GapRecord) -> EngineResult<GapRecord>;
    async fn gap_save_batch(&self, gaps: Vec<GapRecord>) -> EngineResult<Vec<GapRecord>>;
    async fn gap_load(&self, filter: GapFilter) -> EngineResult<Vec<GapRecord>>;
    async fn gap_mark_synced(&self, ids: Vec<i64>) -> EngineResult<usize>;
}

/// Queue family — the fallback fire-and-forget channel (spec.md §4.2).
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn enqueue(&self, message_type: &str, payload: serde_json::Value) -> EngineResult<()>;
}

/// A stream of trades for one or more symbols, ordered per symbol (spec.md §6).
#[async_trait]
pub trait TradeSource: Send + Sync {
    async fn next(&mut self) -> Option<Trade>;
}

/// Looks up the latest `SymbolConfig` for a symbol (spec.md §6).
#[async_trait]
pub trait SymbolConfigSource: Send + Sync {
    async fn get(&self, symbol: &str) -> Option<SymbolConfig>;
}

/// Receives completed-candle events for external fan-out (spec.md §6, §9 — the
/// symbol-rooms/WebSocket gateway is explicitly out of core).
pub trait EventSink: Send + Sync {
    fn publish(&self, exchange: &str, symbol: &str, timeframe: &str, candle: FootprintCandle);
}
