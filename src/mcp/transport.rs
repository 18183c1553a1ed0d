//! Transports carrying JSON-RPC messages between [`McpSession`](super::McpSession)
//! and a server.
//!
//! [`HttpTransport`] implements the MCP "streamable HTTP" transport: every
//! message is POSTed to a single endpoint, the server answers with either a
//! JSON body or a short SSE stream, and an optional `Mcp-Session-Id` header
//! ties the requests of one session together.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use super::error::McpError;
use super::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::config::McpConfig;

const SESSION_HEADER: &str = "mcp-session-id";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const END_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// The channel a session talks through.
///
/// Release is split in two so the session can run it in order: `end_session`
/// drops the server-side handshake state, `close` drops the channel itself.
/// `abort` is the synchronous variant of both, used from `Drop`.
pub trait McpTransport: Send {
    /// Establish the channel.
    fn open(&mut self) -> impl Future<Output = Result<(), McpError>> + Send;

    /// Send a request and wait for the matching response.
    fn send(
        &mut self,
        request: &JsonRpcRequest,
    ) -> impl Future<Output = Result<JsonRpcResponse, McpError>> + Send;

    /// Send a notification; there is no response to wait for.
    fn notify(
        &mut self,
        notification: &JsonRpcNotification,
    ) -> impl Future<Output = Result<(), McpError>> + Send;

    /// Release the server-side session established by the handshake.
    fn end_session(&mut self) -> impl Future<Output = Result<(), McpError>> + Send;

    /// Release the channel.
    fn close(&mut self) -> impl Future<Output = Result<(), McpError>> + Send;

    /// Drop everything without awaiting anything.
    fn abort(&mut self);

    /// Number of live handles (connections, session ids) this transport holds.
    fn open_handles(&self) -> usize;
}

// ── Streamable HTTP ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct HttpTransport {
    url: Url,
    auth_token: Option<String>,
    client: Option<Client>,
    session_id: Option<String>,
}

impl HttpTransport {
    pub fn new(url: Url, auth_token: Option<String>) -> Self {
        Self {
            url,
            auth_token,
            client: None,
            session_id: None,
        }
    }

    pub fn from_config(cfg: &McpConfig) -> Self {
        Self::new(cfg.server_url.clone(), cfg.auth_token.clone())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn client(&self) -> Result<&Client, McpError> {
        self.client
            .as_ref()
            .ok_or_else(|| McpError::Connection("transport is not open".into()))
    }

    async fn post(&mut self, body: Value) -> Result<reqwest::Response, McpError> {
        let mut req = self
            .client()?
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&body);

        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(sid) = &self.session_id {
            req = req.header(SESSION_HEADER, sid);
        }

        let response = req.send().await.map_err(|e| {
            McpError::Connection(format!("request to '{}' failed: {e}", self.url))
        })?;

        if let Some(sid) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(sid.to_string());
        }

        let status = response.status();
        if status == StatusCode::NOT_FOUND && self.session_id.is_some() {
            self.session_id = None;
            return Err(McpError::Connection("server expired the MCP session".into()));
        }
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(McpError::Connection(format!(
                "server returned HTTP {}: {}",
                status,
                truncate_str(&body_text, 500)
            )));
        }

        Ok(response)
    }
}

impl McpTransport for HttpTransport {
    async fn open(&mut self) -> Result<(), McpError> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| McpError::Connection(format!("cannot build HTTP client: {e}")))?;
        self.client = Some(client);
        tracing::debug!(url = %self.url, "MCP: transport opened");
        Ok(())
    }

    async fn send(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let body = serde_json::to_value(request)
            .map_err(|e| McpError::Protocol(format!("cannot encode request: {e}")))?;
        let response = self.post(body).await?;

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let text = response
            .text()
            .await
            .map_err(|e| McpError::Connection(format!("failed to read response body: {e}")))?;

        if is_sse {
            return sse_messages(&text)
                .into_iter()
                .filter_map(|m| serde_json::from_value::<JsonRpcResponse>(m).ok())
                .find(|m| m.answers(request.id))
                .ok_or_else(|| {
                    McpError::Protocol(format!(
                        "event stream carried no response to request {}",
                        request.id
                    ))
                });
        }

        serde_json::from_str::<JsonRpcResponse>(&text).map_err(|e| {
            McpError::Protocol(format!(
                "response is not valid JSON-RPC ({e}): {}",
                truncate_str(&text, 200)
            ))
        })
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), McpError> {
        let body = serde_json::to_value(notification)
            .map_err(|e| McpError::Protocol(format!("cannot encode notification: {e}")))?;
        self.post(body).await.map(|_| ())
    }

    async fn end_session(&mut self) -> Result<(), McpError> {
        let Some(sid) = self.session_id.take() else {
            return Ok(());
        };
        let mut req = self
            .client()?
            .delete(self.url.clone())
            .header(SESSION_HEADER, &sid)
            .timeout(END_SESSION_TIMEOUT);
        if let Some(token) = &self.auth_token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let result = req.send().await;
        match result {
            // 405 means the server does not support explicit termination.
            Ok(r) if r.status().is_success() || r.status() == StatusCode::METHOD_NOT_ALLOWED => {
                Ok(())
            }
            Ok(r) => Err(McpError::Connection(format!(
                "session termination returned HTTP {}",
                r.status()
            ))),
            Err(e) => Err(McpError::Connection(format!("session termination failed: {e}"))),
        }
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.client = None;
        tracing::debug!(url = %self.url, "MCP: transport closed");
        Ok(())
    }

    fn abort(&mut self) {
        self.session_id = None;
        self.client = None;
    }

    fn open_handles(&self) -> usize {
        usize::from(self.client.is_some()) + usize::from(self.session_id.is_some())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Decode the `data:` payloads of an SSE body. Events whose data is not JSON
/// are skipped.
fn sse_messages(body: &str) -> Vec<Value> {
    let normalized = body.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter_map(|event| {
            let data: Vec<&str> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|d| d.strip_prefix(' ').unwrap_or(d))
                .collect();
            if data.is_empty() {
                return None;
            }
            serde_json::from_str(&data.join("\n")).ok()
        })
        .collect()
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let boundary = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(max_len);
        format!("{}...", &s[..boundary])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sse_body_yields_json_events_only() {
        let body = "event: message\r\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\r\n\r\n\
                    : keep-alive\n\n\
                    data: not json\n\n\
                    data: {\"jsonrpc\":\"2.0\",\n\
                    data: \"id\":2,\"result\":{\"ok\":true}}\n\n";
        let msgs = sse_messages(body);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["id"], 1);
        assert_eq!(msgs[1], json!({"jsonrpc": "2.0", "id": 2, "result": {"ok": true}}));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 5), "hello...");
        assert_eq!(truncate_str("żółw", 3), "żó...");
    }

    #[test]
    fn new_transport_holds_no_handles() {
        let t = HttpTransport::new(Url::parse("http://localhost:9/mcp").unwrap(), None);
        assert_eq!(t.open_handles(), 0);
        assert!(t.session_id().is_none());
    }

    #[tokio::test]
    async fn open_then_abort_releases_everything() {
        let mut t = HttpTransport::new(Url::parse("http://localhost:9/mcp").unwrap(), None);
        t.open().await.unwrap();
        assert_eq!(t.open_handles(), 1);
        t.abort();
        assert_eq!(t.open_handles(), 0);
    }

    #[tokio::test]
    async fn send_before_open_is_a_connection_error() {
        let mut t = HttpTransport::new(Url::parse("http://localhost:9/mcp").unwrap(), None);
        let err = t
            .send(&JsonRpcRequest::new(1, "ping", None))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Connection(_)));
    }
}
