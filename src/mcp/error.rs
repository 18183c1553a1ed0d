//! Error taxonomy for the MCP session manager.

use std::time::Duration;

use serde_json::Value;

/// Errors surfaced by [`McpSession`](super::McpSession) and its transports.
///
/// `Connection` and `Protocol` are transport-level when the transport raises
/// them (unreachable server, a body that is not JSON-RPC): the session is torn
/// down and moves to `Closed`. A `Protocol` error found by the session in a
/// well-formed reply (a malformed `tools/list` or `tools/call` result, a
/// repeated pagination cursor) leaves it `Ready`, like the remaining variants.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// The transport could not be opened, or the server became unreachable.
    #[error("MCP connection failed: {0}")]
    Connection(String),

    /// The `initialize` handshake was rejected or never answered.
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    /// Operation attempted outside the `Ready` state.
    #[error("MCP session is not connected")]
    NotConnected,

    /// The server reported a tool-level failure. `payload` is the server's
    /// error object (or the `isError` result) verbatim.
    #[error("MCP tool '{tool}' failed: {payload}")]
    RemoteTool { tool: String, payload: Value },

    /// No response arrived within the configured bound.
    #[error("MCP request '{method}' timed out after {}ms", .after.as_millis())]
    Timeout { method: String, after: Duration },

    /// The server answered with something that is not a JSON-RPC message.
    #[error("MCP protocol error: {0}")]
    Protocol(String),
}

impl McpError {
    /// Whether this error invalidates the underlying transport.
    pub fn is_transport_level(&self) -> bool {
        matches!(self, McpError::Connection(_) | McpError::Protocol(_))
    }
}
