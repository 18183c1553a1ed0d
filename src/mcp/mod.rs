//! MCP (Model Context Protocol) client.
//!
//! [`McpSession`] drives one connection to a tool server: `initialize`
//! handshake, `tools/list`, `tools/call`, and teardown. The wire is
//! abstracted by [`McpTransport`]; [`HttpTransport`] speaks JSON-RPC 2.0 over
//! the streamable HTTP transport.
//!
//! Spec: <https://modelcontextprotocol.io/specification/2025-03-26>

pub mod client;
pub mod error;
pub mod protocol;
pub mod transport;

pub use client::{Handshake, McpSession, SessionOptions, SessionState, ToolInvocation};
pub use error::McpError;
pub use protocol::{
    Content, GITHUB_TOOL_PREFIXES, ToolCallResult, ToolDescriptor, filter_tools_by_prefix,
};
pub use transport::{HttpTransport, McpTransport};
