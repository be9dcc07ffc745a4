//! Full lifecycle through the public entrypoint: build the orchestrator against
//! a temporary SQLite database and socket, start it with a seeded symbol, push
//! a trade through the ingestion channel, then shut down and confirm the flush
//! completed within its timeout.

use footprint_engine::application::bootstrap::Orchestrator;
use footprint_engine::application::gap_writer::GapWriterConfig;
use footprint_engine::config::{Config, EngineEnvConfig, ObservabilityEnvConfig, QueueConfig};
use footprint_engine::domain::market::symbol_config::SymbolConfig;
use footprint_engine::domain::market::trade::{Trade, TradeSide};
use footprint_engine::infrastructure::ipc::client::IpcClientConfig;
use std::time::Duration;

fn test_config(tag: &str) -> Config {
    let dir = std::env::temp_dir();
    let socket_path = dir.join(format!("footprint-engine-orchestrator-{tag}-{}.sock", std::process::id())).to_string_lossy().into_owned();
    let database_url = format!("sqlite://{}", dir.join(format!("footprint-engine-orchestrator-{tag}-{}.db", std::process::id())).to_string_lossy());

    Config {
        engine: EngineEnvConfig {
            exchange: "binance".to_string(),
            worker_count: 2,
            socket_path,
            ready_timeout: Duration::from_secs(5),
            shutdown_flush_timeout: Duration::from_secs(5),
            database_url,
            max_connections: 16,
            mailbox_capacity: 64,
            dirty_flush_interval: Duration::from_millis(100),
        },
        ipc_client: IpcClientConfig::default(),
        gap_writer: GapWriterConfig::default(),
        queue: QueueConfig { batch_size: 50, poll_interval: Duration::from_millis(100), retention: Duration::from_secs(3600) },
        observability: ObservabilityEnvConfig::default(),
    }
}

#[tokio::test]
async fn orchestrator_routes_a_trade_and_shuts_down_cleanly() {
    let config = test_config("lifecycle");
    let symbols = vec![SymbolConfig {
        exchange: "binance".to_string(),
        symbol: "BTCUSDT".to_string(),
        tick_value: 0.01,
        bin_multiplier: 1,
        precision: None,
        min_price: None,
        max_price: None,
    }];

    let orchestrator = Orchestrator::build(config).await.expect("orchestrator should build");
    let handle = orchestrator.start(symbols).await.expect("orchestrator should start");

    let trade_tx = handle.trade_sender();
    trade_tx
        .send(Trade {
            symbol: "BTCUSDT".to_string(),
            timestamp: 1_700_000_000_000,
            trade_id: 1,
            price: 50_000.0,
            quantity: 1.0,
            side: TradeSide::Buy,
            trade_type: None,
        })
        .await
        .expect("trade channel should accept the trade");

    // Let the ingestion task and worker mailbox drain the trade.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let health = handle.health().await;
    assert_eq!(health.worker_count, 2);

    let report = handle.shutdown(Duration::from_secs(5)).await;
    assert!(!report.pool_flush_timed_out, "shutdown should complete within the configured timeout");
}
