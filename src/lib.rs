//! Sandbridge: a developer-agent backend with sandboxed tool execution.
//!
//! The library is organized around two pieces of machinery:
//!
//! - the **tool bridge**: discovering loosely-typed tool descriptors from a
//!   remote tool server ([`mcp`]) and turning them into validated callable
//!   functions for an agent loop ([`bridge`]);
//! - the **session orchestrator**: the state machine that provisions a
//!   sandboxed execution environment, waits for its tool server to become
//!   healthy, and hands a ready endpoint to the bridge ([`sandbox`],
//!   [`session`]).
//!
//! Everything else is supporting cast: the tool server itself ([`server`],
//! [`tools`]), progress events ([`bus`]), and configuration ([`config`]).

pub mod bridge;
pub mod bus;
pub mod config;
pub mod mcp;
pub mod sandbox;
pub mod server;
pub mod session;
pub mod tools;

pub use bridge::{CallableTool, ToolBridge, ToolResult};
pub use mcp::client::RemoteToolClient;
pub use sandbox::{SandboxSession, SessionOrchestrator, SessionState};
pub use session::AgentSession;
