//! JSON-RPC 2.0 framing for the daemon socket.
//!
//! Wire format: one JSON-RPC object per line, `\n` separated. Each inbound
//! line is parsed independently; a parse failure closes the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Internal or handler error; the message carries the domain diagnostic.
pub const INTERNAL_ERROR: i64 = -32000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    /// Mirrored back verbatim; may be a number or a string
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

impl From<&DomainError> for RpcError {
    fn from(err: &DomainError) -> Self {
        Self {
            code: INTERNAL_ERROR,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parses_with_numeric_and_string_ids() {
        let req: RpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"method":"daemon.status"}"#,
        )
        .unwrap();
        assert_eq!(req.method, "daemon.status");
        assert_eq!(req.id, Some(Value::from(1)));

        let req: RpcRequest = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":"abc","method":"session.list","params":{}}"#,
        )
        .unwrap();
        assert_eq!(req.id, Some(Value::from("abc")));
    }

    #[test]
    fn test_response_shape() {
        let ok = RpcResponse::ok(Value::from(1), serde_json::json!({"running": true}));
        let line = serde_json::to_string(&ok).unwrap();
        assert!(line.contains("\"result\""));
        assert!(!line.contains("\"error\""));

        let err = RpcResponse::err(Value::from(1), METHOD_NOT_FOUND, "no such method");
        let line = serde_json::to_string(&err).unwrap();
        assert!(line.contains("-32601"));
        assert!(!line.contains("\"result\""));
    }

    #[test]
    fn test_domain_error_mapping() {
        let err = DomainError::conflict("active session already exists for project p");
        let rpc: RpcError = (&err).into();
        assert_eq!(rpc.code, INTERNAL_ERROR);
        assert!(rpc.message.contains("already exists"));
    }
}
