//! In-core adapters for the ports the real collaborators (exchange feeds, the
//! symbol-sync workflow, the WebSocket fan-out gateway) would implement in a full
//! deployment — all explicitly out of scope per spec.md §1. These let the engine
//! run and be tested standalone: a channel any external feed can push `Trade`s
//! into, an in-memory symbol registry, and a `broadcast`-backed event sink.
//!
//! Grounded on the teacher's `SystemHandle`/`broadcast::Sender<Candle>` pattern
//! (`src/application/system.rs`) for the event sink, and the teacher's
//! `RwLock<HashMap<...>>`-backed caches (`application/market_data/spread_cache.rs`
//! equivalent) for the symbol config source.

use crate::domain::market::footprint_candle::FootprintCandle;
use crate::domain::market::symbol_config::SymbolConfig;
use crate::domain::market::trade::Trade;
use crate::domain::ports::{EventSink, SymbolConfigSource, TradeSource};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::{broadcast, mpsc};

/// A completed-candle event published on the `EventSink` broadcast channel.
#[derive(Debug, Clone)]
pub struct CandleEvent {
    pub exchange: String,
    pub symbol: String,
    pub timeframe: String,
    pub candle: FootprintCandle,
}

/// `EventSink` backed by a `tokio::sync::broadcast` channel. An external
/// WebSocket fan-out gateway (out of scope) subscribes with `subscribe()`.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<CandleEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CandleEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, exchange: &str, symbol: &str, timeframe: &str, candle: FootprintCandle) {
        // No subscribers is not an error: the gateway is an optional collaborator.
        let _ = self.sender.send(CandleEvent {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            candle,
        });
    }
}

/// `TradeSource` backed by an `mpsc` channel. Any external trade feed (exchange
/// WS client, a replay harness) pushes through the paired `mpsc::Sender`.
pub struct ChannelTradeSource {
    receiver: mpsc::Receiver<Trade>,
}

impl ChannelTradeSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<Trade>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { receiver: rx })
    }
}

#[async_trait]
impl TradeSource for ChannelTradeSource {
    async fn next(&mut self) -> Option<Trade> {
        self.receiver.recv().await
    }
}

/// In-memory `SymbolConfigSource`, suitable for tests and as the default registry
/// when no external symbol-sync workflow (out of scope) is wired in. Seeded at
/// construction and mutable via `upsert` for an operator config-change action.
pub struct InMemorySymbolConfigSource {
    configs: RwLock<HashMap<String, SymbolConfig>>,
}

impl InMemorySymbolConfigSource {
    pub fn new(seed: impl IntoIterator<Item = SymbolConfig>) -> Self {
        let configs = seed.into_iter().map(|c| (c.symbol.clone(), c)).collect();
        Self { configs: RwLock::new(configs) }
    }

    pub fn upsert(&self, config: SymbolConfig) {
        self.configs
            .write()
            .expect("symbol config registry lock poisoned")
            .insert(config.symbol.clone(), config);
    }
}

#[async_trait]
impl SymbolConfigSource for InMemorySymbolConfigSource {
    async fn get(&self, symbol: &str) -> Option<SymbolConfig> {
        self.configs.read().expect("symbol config registry lock poisoned").get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(symbol: &str) -> SymbolConfig {
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

    #[tokio::test]
    async fn symbol_config_source_returns_seeded_and_upserted_entries() {
        let source = InMemorySymbolConfigSource::new([config("BTCUSDT")]);
        assert!(source.get("BTCUSDT").await.is_some());
        assert!(source.get("ETHUSDT").await.is_none());

        source.upsert(config("ETHUSDT"));
        assert!(source.get("ETHUSDT").await.is_some());
    }

    #[tokio::test]
    async fn channel_trade_source_yields_pushed_trades() {
        let (tx, mut source) = ChannelTradeSource::new(4);
        tx.send(Trade {
            symbol: "BTCUSDT".to_string(),
            timestamp: 1,
            trade_id: 1,
            price: 1.0,
            quantity: 1.0,
            side: crate::domain::market::trade::TradeSide::Buy,
            trade_type: None,
        })
        .await
        .unwrap();
        drop(tx);

        assert!(source.next().await.is_some());
        assert!(source.next().await.is_none());
    }

    #[test]
    fn broadcast_event_sink_does_not_panic_without_subscribers() {
        let sink = BroadcastEventSink::new(16);
        let candle = FootprintCandle::new_empty("binance", "BTCUSDT", crate::domain::market::timeframe::Timeframe::OneSec, 0, 1.0);
        sink.publish("binance", "BTCUSDT", "1s", candle);
    }
}
