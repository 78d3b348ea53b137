//! # ycode-mcp
//!
//! Client side of the Model Context Protocol. Each configured server is a
//! long-lived child process spoken to with newline-delimited JSON-RPC 2.0
//! over its stdin/stdout. Only the tool surface is used: `initialize`,
//! `tools/list` and `tools/call`.

pub mod client;
pub mod protocol;
pub mod provider;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use provider::McpToolProvider;
pub use transport::{McpTransport, StdioTransport};
pub use types::{McpContent, McpServerInfo, McpToolDef, McpToolResult};
