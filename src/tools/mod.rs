//! Sandbox tool implementations.
//!
//! Thin wrappers around filesystem calls and shell one-liners, confined to
//! a workspace root and dispatched through the [`ToolRegistry`]. The tool
//! server ([`crate::server`]) exposes this registry over the tool-calling
//! protocol.

pub mod analyze;
pub mod cmd;
pub mod fs;
pub mod jsonq;
pub mod registry;
pub mod search;
pub mod types;

pub use registry::ToolRegistry;
pub use types::{Tool, ToolContext, ToolError};
