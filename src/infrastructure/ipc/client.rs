//! Socket client used by the CLI to talk to a running daemon.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use super::protocol::{RpcRequest, RpcResponse, JSONRPC_VERSION};
use crate::domain::error::{DomainError, DomainResult};

/// One connection to the daemon socket.
pub struct IpcClient {
    stream: UnixStream,
    next_id: AtomicU64,
}

impl IpcClient {
    pub async fn connect(socket_path: &Path) -> DomainResult<Self> {
        let stream = UnixStream::connect(socket_path).await.map_err(|e| {
            DomainError::Operational(format!(
                "cannot reach daemon at {}: {e} (is it running?)",
                socket_path.display()
            ))
        })?;
        Ok(Self {
            stream,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send one request and wait for its response.
    pub async fn call(&mut self, method: &str, params: Option<Value>) -> DomainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.to_string(),
            params,
        };

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let (read_half, mut write_half) = self.stream.split();
        write_half.write_all(line.as_bytes()).await?;

        let mut lines = BufReader::new(read_half).lines();
        // Pipelining is allowed by the protocol but this client sends one
        // request at a time, so responses arrive in order.
        while let Some(response_line) = lines.next_line().await? {
            let response: RpcResponse = serde_json::from_str(&response_line)?;
            if response.id != Value::from(id) {
                continue;
            }
            if let Some(error) = response.error {
                return Err(DomainError::Operational(error.message));
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }

        Err(DomainError::Operational(
            "daemon closed the connection".to_string(),
        ))
    }
}
