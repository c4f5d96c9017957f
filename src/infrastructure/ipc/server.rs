//! Unix-socket RPC server.
//!
//! One accept-loop task, one task per connection, one task per in-flight
//! request. Responses on a connection are written by a single writer task
//! in request-completion order.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, watch};

use super::protocol::{RpcRequest, RpcResponse, INTERNAL_ERROR, METHOD_NOT_FOUND};
use crate::domain::error::{DomainError, DomainResult};

type HandlerFuture = Pin<Box<dyn Future<Output = DomainResult<Value>> + Send>>;
type Handler = Arc<dyn Fn(Option<Value>) -> HandlerFuture + Send + Sync>;

/// Method-dispatch table shared by all connections.
#[derive(Default, Clone)]
pub struct MethodRegistry {
    handlers: HashMap<String, Handler>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a method name to an async handler. Rebinding replaces.
    pub fn register<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DomainResult<Value>> + Send + 'static,
    {
        self.handlers.insert(
            method.into(),
            Arc::new(move |params| Box::pin(handler(params))),
        );
    }

    fn get(&self, method: &str) -> Option<Handler> {
        self.handlers.get(method).cloned()
    }
}

/// Socket server driving the registry.
pub struct IpcServer {
    listener: UnixListener,
    registry: Arc<MethodRegistry>,
    shutdown: watch::Receiver<bool>,
}

impl IpcServer {
    /// Bind the socket at `path` with owner-only permissions.
    ///
    /// The parent directory is created with mode 0700 and the socket is
    /// chmod'ed to 0600 after binding.
    pub fn bind(
        path: &Path,
        registry: MethodRegistry,
        shutdown: watch::Receiver<bool>,
    ) -> DomainResult<Self> {
        use std::os::unix::fs::PermissionsExt;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
        }
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(path).map_err(|e| {
            DomainError::Fatal(format!("failed to bind socket {}: {e}", path.display()))
        })?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;

        Ok(Self {
            listener,
            registry: Arc::new(registry),
            shutdown,
        })
    }

    /// Accept loop. Returns when the shutdown signal flips.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let registry = Arc::clone(&self.registry);
                            let shutdown = self.shutdown.clone();
                            tokio::spawn(handle_connection(stream, registry, shutdown));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                        }
                    }
                }
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        tracing::debug!("IPC server stopping");
                        return;
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    stream: UnixStream,
    registry: Arc<MethodRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // Single writer task; handler tasks push completed responses here.
    let (tx, mut rx) = mpsc::channel::<RpcResponse>(64);
    let writer = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let mut line = match serde_json::to_string(&response) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize response");
                    continue;
                }
            };
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let request: RpcRequest = match serde_json::from_str(&line) {
                            Ok(request) => request,
                            Err(e) => {
                                // Parse failures close the connection.
                                tracing::debug!(error = %e, "unparseable frame, closing connection");
                                break;
                            }
                        };
                        let registry = Arc::clone(&registry);
                        let tx = tx.clone();
                        tokio::spawn(dispatch(request, registry, tx));
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(error = %e, "connection read failed");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    drop(tx);
    let _ = writer.await;
}

async fn dispatch(
    request: RpcRequest,
    registry: Arc<MethodRegistry>,
    tx: mpsc::Sender<RpcResponse>,
) {
    let id = request.id.unwrap_or(Value::Null);
    let response = match registry.get(&request.method) {
        Some(handler) => match handler(request.params).await {
            Ok(result) => RpcResponse::ok(id, result),
            Err(e) => RpcResponse::err(id, INTERNAL_ERROR, e.to_string()),
        },
        None => RpcResponse::err(
            id,
            METHOD_NOT_FOUND,
            format!("method '{}' not found", request.method),
        ),
    };
    let _ = tx.send(response).await;
}
