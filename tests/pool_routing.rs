//! End-to-end trade routing through the worker pool: consistent symbol→worker
//! assignment, state persistence on shutdown, and completed-candle publication
//! on the broadcast event sink.

use async_trait::async_trait;
use footprint_engine::application::gap_writer;
use footprint_engine::application::router::pool::{Pool, PoolConfig};
use footprint_engine::domain::errors::EngineResult;
use footprint_engine::domain::market::gap::{GapFilter, GapRecord};
use footprint_engine::domain::market::symbol_config::SymbolConfig;
use footprint_engine::domain::market::trade::{Trade, TradeSide};
use footprint_engine::domain::ports::{EventSink, GapStore, StateStore};
use footprint_engine::infrastructure::adapters::{BroadcastEventSink, InMemorySymbolConfigSource};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingStateStore {
    saved: Mutex<HashMap<(String, String), String>>,
}

#[async_trait]
impl StateStore for RecordingStateStore {
    async fn save(&self, exchange: &str, symbol: &str, state_json: &str) -> EngineResult<()> {
        self.saved.lock().unwrap().insert((exchange.to_string(), symbol.to_string()), state_json.to_string());
        Ok(())
    }

    async fn save_batch(&self, states: Vec<(String, String, String)>) -> EngineResult<()> {
        let mut guard = self.saved.lock().unwrap();
        for (exchange, symbol, state_json) in states {
            guard.insert((exchange, symbol), state_json);
        }
        Ok(())
    }

    async fn load(&self, exchange: &str, symbol: &str) -> EngineResult<Option<String>> {
        Ok(self.saved.lock().unwrap().get(&(exchange.to_string(), symbol.to_string())).cloned())
    }

    async fn load_batch(&self, exchange: &str, symbols: Vec<String>) -> EngineResult<Vec<(String, String)>> {
        let guard = self.saved.lock().unwrap();
        Ok(symbols
            .into_iter()
            .filter_map(|s| guard.get(&(exchange.to_string(), s.clone())).map(|json| (s, json.clone())))
            .collect())
    }

    async fn load_all(&self) -> EngineResult<Vec<(String, String, String)>> {
        Ok(self.saved.lock().unwrap().iter().map(|((e, s), j)| (e.clone(), s.clone(), j.clone())).collect())
    }
}

struct NoopGapStore;

#[async_trait]
impl GapStore for NoopGapStore {
    async fn gap_save(&self, gap: GapRecord) -> EngineResult<GapRecord> {
        Ok(gap)
    }
    async fn gap_save_batch(&self, gaps: Vec<GapRecord>) -> EngineResult<Vec<GapRecord>> {
        Ok(gaps)
    }
    async fn gap_load(&self, _filter: GapFilter) -> EngineResult<Vec<GapRecord>> {
        Ok(Vec::new())
    }
    async fn gap_mark_synced(&self, ids: Vec<i64>) -> EngineResult<usize> {
        Ok(ids.len())
    }
}

fn symbol_config(symbol: &str) -> SymbolConfig {
    SymbolConfig {
        exchange: "binance".to_string(),
        symbol: symbol.to_string(),
        tick_value: 0.01,
        bin_multiplier: 1,
        precision: None,
        min_price: None,
        max_price: None,
    }
}

fn trade(symbol: &str, trade_id: u64, timestamp: i64, price: f64) -> Trade {
    Trade {
        symbol: symbol.to_string(),
        timestamp,
        trade_id,
        price,
        quantity: 1.0,
        side: TradeSide::Buy,
        trade_type: None,
    }
}

#[tokio::test]
async fn routed_trades_update_state_and_publish_completed_candles() {
    let symbols = vec!["BTCUSDT".to_string(), "ETHUSDT".to_string(), "SOLUSDT".to_string()];
    let state_store = Arc::new(RecordingStateStore::default());
    let gap_writer = gap_writer::spawn(Arc::new(NoopGapStore), None, Default::default());
    let symbol_config_source = Arc::new(InMemorySymbolConfigSource::new(symbols.iter().map(|s| symbol_config(s))));
    let event_sink = Arc::new(BroadcastEventSink::new(64));
    let mut subscriber = event_sink.subscribe();

    let config = PoolConfig {
        worker_count: 3,
        ready_timeout: Duration::from_secs(2),
        flush_interval: Duration::from_millis(50),
        mailbox_capacity: 64,
    };

    let pool = {
        let state_store = state_store.clone();
        Pool::start(
            config,
            "binance".to_string(),
            move |_id| state_store.clone() as Arc<dyn StateStore>,
            gap_writer,
            symbol_config_source as Arc<dyn footprint_engine::domain::ports::SymbolConfigSource>,
            event_sink as Arc<dyn EventSink>,
            symbols.clone(),
            None,
        )
        .await
        .expect("pool should start")
    };

    // Cross a 1s boundary on BTCUSDT to force a candle completion.
    pool.route_trade(trade("BTCUSDT", 1, 1_700_000_000_000, 50_000.0)).await;
    pool.route_trade(trade("BTCUSDT", 2, 1_700_000_001_000, 50_100.0)).await;
    pool.route_trade(trade("ETHUSDT", 1, 1_700_000_000_000, 2_500.0)).await;

    let event = tokio::time::timeout(Duration::from_secs(1), subscriber.recv())
        .await
        .expect("a completed candle should be published")
        .expect("channel should not be closed");
    assert_eq!(event.symbol, "BTCUSDT");
    assert_eq!(event.timeframe, "1s");

    let health = pool.health().await;
    assert_eq!(health.worker_count, 3);
    assert!(health.unhealthy_workers.is_empty());

    let timed_out = pool.shutdown(Duration::from_secs(2)).await;
    assert!(!timed_out, "pool shutdown should finish within its timeout");

    let saved = state_store.load("binance", "BTCUSDT").await.unwrap();
    assert!(saved.is_some(), "BTCUSDT state should have been flushed on shutdown");
}

#[tokio::test]
async fn same_symbol_always_lands_on_the_same_worker_across_restarts() {
    use footprint_engine::application::router::hash_ring::assign;
    let first = assign("BTCUSDT", 5);
    let second = assign("BTCUSDT", 5);
    assert_eq!(first, second);
}
