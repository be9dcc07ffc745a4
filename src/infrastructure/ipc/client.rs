//! IpcClient — dials the persistence server's Unix socket, multiplexes in-flight
//! requests over one connection keyed by request id (spec.md §4.1).
//!
//! Grounded on the teacher's `oneshot`-reply mailbox command pattern
//! (`src/application/agents/sentinel.rs`'s `LoadAvailableSymbols(oneshot::Sender<..>)`),
//! generalized from an in-process mailbox to a socket-backed pending map.

use crate::domain::errors::{EngineError, EngineResult};
use crate::infrastructure::ipc::envelope::{Request, RequestFamily, Response};
use crate::infrastructure::ipc::frame::{read_frame, write_frame, FrameError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct IpcClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for IpcClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            max_retries: 5,
            base_retry_delay: Duration::from_millis(100),
            max_retry_delay: Duration::from_secs(5),
        }
    }
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<EngineResult<Response>>>>>;

/// A connected client. `close()` or a transport error rejects every pending
/// request with `EngineError::Connection`; late responses for an id that already
/// timed out are dropped (the pending entry was removed on timeout).
pub struct IpcClient {
    write_half: Mutex<Option<WriteHalf<UnixStream>>>,
    pending: PendingMap,
    request_timeout: Duration,
}

impl IpcClient {
    /// Dial `path`, retrying with exponential backoff up to `config.max_retries`.
    pub async fn connect(path: &str, config: &IpcClientConfig) -> EngineResult<Arc<Self>> {
        let mut delay = config.base_retry_delay;
        let mut last_err = None;

        for attempt in 0..=config.max_retries {
            match tokio::time::timeout(config.connect_timeout, UnixStream::connect(path)).await {
                Ok(Ok(stream)) => {
                    let (read_half, write_half) = tokio::io::split(stream);
                    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
                    let client = Arc::new(Self {
                        write_half: Mutex::new(Some(write_half)),
                        pending: pending.clone(),
                        request_timeout: config.request_timeout,
                    });
                    spawn_reader(read_half, pending);
                    return Ok(client);
                }
                Ok(Err(e)) => last_err = Some(e.to_string()),
                Err(_) => last_err = Some("connect timed out".to_string()),
            }

            if attempt < config.max_retries {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(config.max_retry_delay);
            }
        }

        Err(EngineError::Connection(format!(
            "failed to connect to {path} after {} attempts: {}",
            config.max_retries + 1,
            last_err.unwrap_or_default()
        )))
    }

    /// Send `request` and await its matching response, bounded by `timeout` (falls
    /// back to the client's configured `request_timeout` when `None`).
    pub async fn send_request(&self, family: RequestFamily, payload: serde_json::Value, timeout: Option<Duration>) -> EngineResult<Response> {
        let id = uuid::Uuid::new_v4().to_string();
        let timestamp = chrono::Utc::now().timestamp_millis();
        let request = Request::new(id.clone(), family, payload, timestamp);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        {
            let mut guard = self.write_half.lock().await;
            let Some(writer) = guard.as_mut() else {
                self.pending.lock().await.remove(&id);
                return Err(EngineError::Connection("client closed".to_string()));
            };
            if let Err(e) = write_frame(writer, &request).await {
                self.pending.lock().await.remove(&id);
                return Err(EngineError::Connection(e.to_string()));
            }
        }

        let wait = timeout.unwrap_or(self.request_timeout);
        match tokio::time::timeout(wait, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(EngineError::Connection("response channel closed".to_string())),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(EngineError::Timeout(wait.as_millis() as u64))
            }
        }
    }

    /// Reject all pending requests with `Disconnected` and close the socket.
    pub async fn close(&self) {
        let mut guard = self.write_half.lock().await;
        if let Some(mut writer) = guard.take() {
            let _ = writer.shutdown().await;
        }
        reject_all(&self.pending, "client closed").await;
    }
}

fn spawn_reader(mut read_half: ReadHalf<UnixStream>, pending: PendingMap) {
    tokio::spawn(async move {
        loop {
            match read_frame::<_, Response>(&mut read_half).await {
                Ok(Some(response)) => {
                    if let Some(tx) = pending.lock().await.remove(&response.id) {
                        let _ = tx.send(Ok(response));
                    } else {
                        debug!("ipc client: response for unknown or timed-out id {}", response.id);
                    }
                }
                Ok(None) => {
                    warn!("ipc client: connection closed by peer");
                    break;
                }
                Err(FrameError::Parse(e)) => {
                    warn!("ipc client: dropping unparseable response frame: {e}");
                    continue;
                }
                Err(FrameError::Io(e)) => {
                    warn!("ipc client: read error: {}", e);
                    break;
                }
            }
        }
        reject_all(&pending, "connection lost").await;
    });
}

async fn reject_all(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(EngineError::Connection(reason.to_string())));
    }
}
