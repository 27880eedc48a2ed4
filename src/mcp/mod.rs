//! Tool-calling protocol support (MCP-shaped JSON-RPC).
//!
//! Layering, bottom up:
//! - [`types`]: wire types for the JSON-RPC envelope and the tool surface;
//! - [`transport`]: the [`McpTransport`](transport::McpTransport) seam and
//!   the HTTP + SSE implementation;
//! - [`client`]: [`RemoteToolClient`](client::RemoteToolClient), the
//!   connection owner exposing tool discovery and invocation.

pub mod client;
pub mod transport;
pub mod types;

pub use client::{ClientError, RemoteToolClient, ToolCallOutcome};
pub use transport::{HttpTransport, McpTransport, TransportConfig, TransportError};
pub use types::ToolDescriptor;
