//! Exercises the IPC transport end to end: a live `IpcServer` bound to a
//! temporary Unix socket, backed by a real SQLite database, driven by an
//! `IpcClient` through the `StateStoreClient`/`GapStoreClient` adapters.

use footprint_engine::domain::market::gap::{GapFilter, GapRecord};
use footprint_engine::domain::ports::{GapStore, StateStore};
use footprint_engine::infrastructure::ipc::client::{IpcClient, IpcClientConfig};
use footprint_engine::infrastructure::ipc_adapters::{GapStoreClient, StateStoreClient};
use footprint_engine::infrastructure::persistence::database::Database;
use footprint_engine::infrastructure::persistence::server;
use std::time::Duration;

async fn start_server(socket_path: &str) -> tokio::sync::oneshot::Sender<()> {
    let db_path = format!("{socket_path}.db");
    let database = Database::new(&format!("sqlite://{db_path}")).await.expect("database should open");
    let ipc_server = server::build(database, socket_path.to_string(), 16);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = ipc_server.serve(shutdown_rx).await;
    });
    // Give the listener a moment to bind; the client's own connect retries
    // would absorb this too, but this keeps the test's first attempt clean.
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx
}

fn socket_path(name: &str) -> String {
    std::env::temp_dir().join(format!("footprint-engine-test-{name}-{}.sock", std::process::id())).to_string_lossy().into_owned()
}

#[tokio::test]
async fn state_store_round_trips_through_the_socket() {
    let path = socket_path("state");
    let shutdown = start_server(&path).await;

    let client = IpcClient::connect(&path, &IpcClientConfig::default()).await.expect("client should connect");
    let store = StateStoreClient::new(client);

    assert!(store.load("binance", "BTCUSDT").await.unwrap().is_none());

    store.save("binance", "BTCUSDT", r#"{"v":1}"#).await.unwrap();
    let loaded = store.load("binance", "BTCUSDT").await.unwrap();
    assert_eq!(loaded.as_deref(), Some(r#"{"v":1}"#));

    store
        .save_batch(vec![
            ("binance".to_string(), "ETHUSDT".to_string(), r#"{"v":2}"#.to_string()),
            ("binance".to_string(), "SOLUSDT".to_string(), r#"{"v":3}"#.to_string()),
        ])
        .await
        .unwrap();
    let all = store.load_all().await.unwrap();
    assert_eq!(all.len(), 3);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn gap_store_save_and_load_round_trips_ordered_descending() {
    let path = socket_path("gap");
    let shutdown = start_server(&path).await;

    let client = IpcClient::connect(&path, &IpcClientConfig::default()).await.expect("client should connect");
    let store = GapStoreClient::new(client);

    store.gap_save(GapRecord::new("binance", "BTCUSDT", 10, 12, 100)).await.unwrap();
    store.gap_save(GapRecord::new("binance", "BTCUSDT", 20, 22, 200)).await.unwrap();

    let gaps = store
        .gap_load(GapFilter { exchange: Some("binance".to_string()), symbol: Some("BTCUSDT".to_string()), synced_only: None })
        .await
        .unwrap();

    assert_eq!(gaps.len(), 2);
    assert!(gaps[0].detected_at > gaps[1].detected_at, "expected newest gap first");

    let ids: Vec<i64> = gaps.iter().filter_map(|g| g.id).collect();
    let updated = store.gap_mark_synced(ids).await.unwrap();
    assert_eq!(updated, 2);

    let _ = shutdown.send(());
}
