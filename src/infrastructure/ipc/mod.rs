//! Newline-delimited JSON-RPC over the daemon's Unix socket.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use protocol::{RpcError, RpcRequest, RpcResponse, INTERNAL_ERROR, METHOD_NOT_FOUND};
pub use server::{IpcServer, MethodRegistry};
