//! IpcServer — accepts Unix-domain-socket connections and dispatches framed
//! requests to per-family handlers (spec.md §4.1, §6).
//!
//! Grounded on the teacher's `ListenerAgent` accept-loop shape
//! (`src/application/agents/listener.rs` equivalent), adapted from a TCP market-data
//! feed loop to a request/response Unix socket with per-connection fan-out.

use crate::domain::errors::EngineError;
use crate::infrastructure::ipc::envelope::{Request, RequestFamily, Response};
use crate::infrastructure::ipc::frame::{read_frame, write_frame, FrameError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// A handler for one request family. Implementations own the actual store and
/// return the JSON payload that goes into `Response::data` on success.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, payload: serde_json::Value) -> Result<serde_json::Value, EngineError>;
}

pub struct IpcServerConfig {
    pub socket_path: String,
    pub max_connections: usize,
}

pub struct IpcServer {
    config: IpcServerConfig,
    handlers: HashMap<RequestFamily, Arc<dyn RequestHandler>>,
}

impl IpcServer {
    pub fn new(config: IpcServerConfig) -> Self {
        Self {
            config,
            handlers: HashMap::new(),
        }
    }

    pub fn register(mut self, family: RequestFamily, handler: Arc<dyn RequestHandler>) -> Self {
        self.handlers.insert(family, handler);
        self
    }

    /// Bind and accept connections until `shutdown` resolves. Connections beyond
    /// `max_connections` are refused at accept time.
    pub async fn serve(self, mut shutdown: tokio::sync::oneshot::Receiver<()>) -> Result<(), EngineError> {
        let _ = std::fs::remove_file(&self.config.socket_path);
        let listener = UnixListener::bind(&self.config.socket_path)
            .map_err(|e| EngineError::Fatal(format!("bind {}: {e}", self.config.socket_path)))?;
        info!("ipc server listening on {}", self.config.socket_path);

        let handlers = Arc::new(self.handlers);
        let active = Arc::new(Mutex::new(0usize));
        let max_connections = self.config.max_connections;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("ipc server shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, _addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            warn!("ipc accept error: {e}");
                            continue;
                        }
                    };

                    let mut guard = active.lock().await;
                    if *guard >= max_connections {
                        warn!("ipc server at max_connections ({max_connections}), refusing connection");
                        drop(stream);
                        continue;
                    }
                    *guard += 1;
                    drop(guard);

                    let handlers = handlers.clone();
                    let active = active.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, handlers).await;
                        *active.lock().await -= 1;
                    });
                }
            }
        }

        let _ = std::fs::remove_file(&self.config.socket_path);
        Ok(())
    }
}

async fn handle_connection(stream: UnixStream, handlers: Arc<HashMap<RequestFamily, Arc<dyn RequestHandler>>>) {
    let (mut read_half, write_half) = tokio::io::split(stream);
    let write_half = Arc::new(Mutex::new(write_half));

    loop {
        let request: Request = match read_frame(&mut read_half).await {
            Ok(Some(req)) => req,
            Ok(None) => break,
            Err(FrameError::Parse(e)) => {
                warn!("ipc connection: dropping unparseable frame: {e}");
                continue;
            }
            Err(FrameError::Io(e)) => {
                debug!("ipc connection read error: {e}");
                break;
            }
        };

        let handlers = handlers.clone();
        let write_half = write_half.clone();
        tokio::spawn(async move {
            let started = std::time::Instant::now();
            let response = match handlers.get(&request.family) {
                Some(handler) => match handler.handle(request.payload).await {
                    Ok(data) => Response::ok(request.id.clone(), data, started.elapsed().as_millis() as u64),
                    Err(e) => Response::err(request.id.clone(), e.to_string()),
                },
                None => Response::err(request.id.clone(), format!("no handler registered for {:?}", request.family)),
            };

            let mut writer = write_half.lock().await;
            if let Err(e) = write_frame(&mut *writer, &response).await {
                error!("ipc connection write error: {e}");
            }
        });
    }
}
