//! MCP session: connect + handshake, tool discovery, tool invocation, and
//! guaranteed teardown.
//!
//! A session is exclusively owned by the task that created it: every
//! operation takes `&mut self`. Callers wanting parallel calls open
//! independent sessions.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use super::error::McpError;
use super::protocol::{
    self, InitializeResult, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ToolCallResult, ToolDescriptor,
};
use super::transport::McpTransport;
use crate::config::McpConfig;

// ── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconnected,
    Connecting,
    Ready,
    Closed,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Bound on every request. `None` waits forever.
    pub call_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            call_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl From<&McpConfig> for SessionOptions {
    fn from(cfg: &McpConfig) -> Self {
        Self {
            call_timeout: cfg.call_timeout,
        }
    }
}

/// What the server told us during `initialize`.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol_version: String,
    pub server_name: String,
    pub server_version: String,
    pub capabilities: Value,
    pub instructions: Option<String>,
}

impl From<InitializeResult> for Handshake {
    fn from(r: InitializeResult) -> Self {
        Self {
            protocol_version: r.protocol_version,
            server_name: r.server_info.name,
            server_version: r.server_info.version,
            capabilities: r.capabilities,
            instructions: r.instructions,
        }
    }
}

/// Result of a tool call together with the observed round trip.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub result: ToolCallResult,
    pub latency: Duration,
}

// ── Session ─────────────────────────────────────────────────────────────────

pub struct McpSession<T: McpTransport> {
    transport: T,
    state: SessionState,
    handshake: Option<Handshake>,
    options: SessionOptions,
    next_id: u64,
}

impl<T: McpTransport> McpSession<T> {
    /// Wrap a transport. No I/O happens until [`connect`](Self::connect).
    pub fn new(transport: T, options: SessionOptions) -> Self {
        Self {
            transport,
            state: SessionState::Unconnected,
            handshake: None,
            options,
            next_id: 1,
        }
    }

    /// Create a session and connect it in one step.
    pub async fn open(transport: T, options: SessionOptions) -> Result<Self, McpError> {
        let mut session = Self::new(transport, options);
        session.connect().await?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Server info from the handshake; `None` unless the session is `Ready`.
    pub fn handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the transport and run the `initialize` handshake.
    ///
    /// On failure the transport is released before returning, so a failed
    /// connect leaves no open handles behind.
    pub async fn connect(&mut self) -> Result<(), McpError> {
        match self.state {
            SessionState::Unconnected => {}
            SessionState::Ready => return Ok(()),
            SessionState::Connecting | SessionState::Closed => return Err(McpError::NotConnected),
        }
        self.state = SessionState::Connecting;

        match self.handshake_inner().await {
            Ok(handshake) => {
                tracing::info!(
                    server = %handshake.server_name,
                    protocol_version = %handshake.protocol_version,
                    "MCP: session ready"
                );
                self.handshake = Some(handshake);
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("MCP: connect failed: {}", e);
                self.teardown().await.ok();
                Err(e)
            }
        }
    }

    async fn handshake_inner(&mut self) -> Result<Handshake, McpError> {
        self.transport.open().await?;

        let request = self.request("initialize", Some(protocol::initialize_params()));
        let response = match self.send_bounded(&request).await {
            Ok(r) => r,
            Err(McpError::Timeout { after, .. }) => {
                return Err(McpError::Handshake(format!(
                    "no initialize response within {}ms",
                    after.as_millis()
                )));
            }
            Err(e) => return Err(e),
        };

        if let Some(error) = response.error {
            return Err(McpError::Handshake(format!("initialize rejected: {error}")));
        }
        let result = response
            .result
            .ok_or_else(|| McpError::Handshake("initialize response has no result".into()))?;
        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Handshake(format!("malformed initialize result: {e}")))?;

        let notification = JsonRpcNotification::new("notifications/initialized");
        let limit = self.options.call_timeout;
        match bounded(limit, self.transport.notify(&notification)).await {
            Some(result) => result?,
            None => {
                return Err(McpError::Handshake(format!(
                    "initialized notification not accepted within {}ms",
                    limit.unwrap_or_default().as_millis()
                )));
            }
        }

        Ok(init.into())
    }

    /// The server's tool catalog, in server order. Follows pagination.
    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>, McpError> {
        self.ensure_ready()?;

        let mut tools = Vec::new();
        let mut seen_cursors = HashSet::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.take().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.call("tools/list", params).await?;
            if let Some(payload) = result.error {
                return Err(McpError::RemoteTool {
                    tool: "tools/list".into(),
                    payload,
                });
            }
            let page: ListToolsResult =
                serde_json::from_value(result.result.unwrap_or(Value::Null)).map_err(|e| {
                    McpError::Protocol(format!("malformed tools/list result: {e}"))
                })?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(McpError::Protocol(format!(
                            "tools/list cursor '{next}' repeated after {} tool(s)",
                            tools.len()
                        )));
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        tracing::debug!("MCP: listed {} tool(s)", tools.len());
        Ok(tools)
    }

    /// Invoke `tool` (a [`ToolDescriptor`] or a bare name) with `arguments`.
    pub async fn call_tool(
        &mut self,
        tool: impl AsRef<str>,
        arguments: Map<String, Value>,
    ) -> Result<ToolInvocation, McpError> {
        self.ensure_ready()?;
        let name = tool.as_ref().to_string();

        tracing::info!(tool = %name, "MCP: calling tool");
        let started = Instant::now();
        let response = self
            .call(
                "tools/call",
                Some(serde_json::json!({ "name": name, "arguments": arguments })),
            )
            .await?;
        let latency = started.elapsed();
        tracing::info!(
            tool = %name,
            latency_ms = latency.as_millis() as u64,
            "MCP: tool call took {:.2}s",
            latency.as_secs_f64()
        );

        if let Some(payload) = response.error {
            return Err(McpError::RemoteTool { tool: name, payload });
        }
        let raw = response.result.unwrap_or(Value::Null);
        let result: ToolCallResult = serde_json::from_value(raw.clone())
            .map_err(|e| McpError::Protocol(format!("malformed tools/call result: {e}")))?;
        if result.is_error {
            return Err(McpError::RemoteTool { tool: name, payload: raw });
        }

        Ok(ToolInvocation {
            tool: name,
            result,
            latency,
        })
    }

    /// Tear the session down: handshake state first, transport second.
    /// Both steps run even if one fails; the first failure is returned.
    pub async fn close(mut self) -> Result<(), McpError> {
        self.teardown().await
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn ensure_ready(&self) -> Result<(), McpError> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(McpError::NotConnected)
        }
    }

    fn request(&mut self, method: &str, params: Option<Value>) -> JsonRpcRequest {
        let id = self.next_id;
        self.next_id += 1;
        JsonRpcRequest::new(id, method, params)
    }

    /// Send a request on a `Ready` session; transport-level failures close it.
    async fn call(&mut self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse, McpError> {
        let request = self.request(method, params);
        match self.send_bounded(&request).await {
            Ok(r) => Ok(r),
            Err(e) if e.is_transport_level() => {
                tracing::warn!(method, "MCP: transport failure, closing session: {}", e);
                self.teardown().await.ok();
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_bounded(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let limit = self.options.call_timeout;
        bounded(limit, self.transport.send(request))
            .await
            .unwrap_or_else(|| {
                Err(McpError::Timeout {
                    method: request.method.clone(),
                    after: limit.unwrap_or_default(),
                })
            })
    }

    async fn teardown(&mut self) -> Result<(), McpError> {
        if self.state == SessionState::Unconnected {
            self.state = SessionState::Closed;
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.handshake = None;

        let limit = self.options.call_timeout;
        let ended = match bounded(limit, self.transport.end_session()).await {
            Some(result) => result,
            None => {
                // Give up on a polite release; drop the session id locally.
                self.transport.abort();
                Err(McpError::Timeout {
                    method: "end_session".into(),
                    after: limit.unwrap_or_default(),
                })
            }
        };
        if let Err(e) = &ended {
            tracing::warn!("MCP: session release failed: {}", e);
        }
        let closed = self.transport.close().await;
        if let Err(e) = &closed {
            tracing::warn!("MCP: transport release failed: {}", e);
        }
        ended.and(closed)
    }
}

/// Await `fut`, giving up after `limit` if one is set. `None` means it expired.
async fn bounded<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

impl<T: McpTransport> Drop for McpSession<T> {
    fn drop(&mut self) {
        if self.transport.open_handles() > 0 || self.handshake.is_some() {
            tracing::debug!("MCP: session dropped without close, aborting transport");
            self.handshake = None;
            self.transport.abort();
        }
        self.state = SessionState::Closed;
    }
}
