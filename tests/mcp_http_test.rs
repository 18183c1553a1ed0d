// End-to-end tests of the streamable HTTP transport against an in-process
// fake MCP server.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use url::Url;

use issue_analyzer::mcp::{
    HttpTransport, McpError, McpSession, McpTransport, SessionOptions, SessionState,
};

const SESSION_ID: &str = "sess-1";

#[derive(Default)]
struct Seen {
    methods: Vec<String>,
    session_headers: Vec<Option<String>>,
    auth: Vec<Option<String>>,
    deleted: Vec<String>,
}

#[derive(Clone, Default)]
struct Fake {
    seen: Arc<Mutex<Seen>>,
    reject_initialize: bool,
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn sse(message: Value) -> Response {
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        format!("event: message\ndata: {message}\n\n"),
    )
        .into_response()
}

async fn mcp_post(State(fake): State<Fake>, headers: HeaderMap, Json(msg): Json<Value>) -> Response {
    let method = msg["method"].as_str().unwrap_or_default().to_string();
    let id = msg.get("id").cloned().unwrap_or(Value::Null);
    let session = header_str(&headers, "mcp-session-id");
    {
        let mut seen = fake.seen.lock().unwrap();
        seen.methods.push(method.clone());
        seen.session_headers.push(session.clone());
        seen.auth.push(header_str(&headers, "authorization"));
    }

    if method != "initialize" && session.as_deref() != Some(SESSION_ID) {
        return (StatusCode::BAD_REQUEST, "missing session").into_response();
    }

    match method.as_str() {
        "initialize" if fake.reject_initialize => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32602, "message": "Unsupported protocol version"}
        }))
        .into_response(),
        "initialize" => (
            [("mcp-session-id", SESSION_ID)],
            Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": "FakeWiki", "version": "0.0.1"}
                }
            })),
        )
            .into_response(),
        "notifications/initialized" => StatusCode::ACCEPTED.into_response(),
        "tools/list" => sse(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {"tools": [
                {"name": "read_wiki_structure", "inputSchema": {"type": "object", "properties": {"repoName": {"type": "string"}}}},
                {"name": "ask_question", "description": "Ask about a repo"},
                {"name": "fail"},
                {"name": "slow"}
            ]}
        })),
        "tools/call" => {
            let name = msg["params"]["name"].as_str().unwrap_or_default();
            match name {
                "fail" => Json(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32000, "message": "Repository not found", "data": {"repo": "x/y"}}
                }))
                .into_response(),
                "slow" => {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Json(json!({"jsonrpc": "2.0", "id": id, "result": {"content": []}})).into_response()
                }
                _ => {
                    let repo = msg["params"]["arguments"]["repoName"].as_str().unwrap_or("?");
                    sse(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": {"content": [{"type": "text", "text": format!("wiki for {repo}")}]}
                    }))
                }
            }
        }
        _ => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .into_response(),
    }
}

async fn mcp_delete(State(fake): State<Fake>, headers: HeaderMap) -> StatusCode {
    if let Some(sid) = header_str(&headers, "mcp-session-id") {
        fake.seen.lock().unwrap().deleted.push(sid);
    }
    StatusCode::OK
}

async fn spawn(fake: Fake) -> Url {
    let app = Router::new()
        .route("/mcp", post(mcp_post).delete(mcp_delete))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/mcp")).unwrap()
}

fn args(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

#[tokio::test]
async fn full_session_over_http() {
    let fake = Fake::default();
    let url = spawn(fake.clone()).await;

    let mut session = McpSession::open(
        HttpTransport::new(url, Some("secret".into())),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.handshake().unwrap().server_name, "FakeWiki");
    assert_eq!(session.transport().session_id(), Some(SESSION_ID));

    let tools = session.list_tools().await.unwrap();
    let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["read_wiki_structure", "ask_question", "fail", "slow"]);
    assert_eq!(tools[1].description.as_deref(), Some("Ask about a repo"));

    let inv = session
        .call_tool(&tools[0], args(&[("repoName", "microsoft/vscode")]))
        .await
        .unwrap();
    assert_eq!(inv.result.text(), "wiki for microsoft/vscode");

    session.close().await.unwrap();

    let seen = fake.seen.lock().unwrap();
    assert_eq!(
        seen.methods,
        ["initialize", "notifications/initialized", "tools/list", "tools/call"]
    );
    assert_eq!(seen.session_headers[0], None);
    assert!(seen.session_headers[1..].iter().all(|h| h.as_deref() == Some(SESSION_ID)));
    assert!(seen.auth.iter().all(|a| a.as_deref() == Some("Bearer secret")));
    assert_eq!(seen.deleted, [SESSION_ID]);
}

#[tokio::test]
async fn remote_tool_error_is_propagated_verbatim() {
    let url = spawn(Fake::default()).await;
    let mut session = McpSession::open(HttpTransport::new(url, None), SessionOptions::default())
        .await
        .unwrap();

    match session.call_tool("fail", Map::new()).await {
        Err(McpError::RemoteTool { tool, payload }) => {
            assert_eq!(tool, "fail");
            assert_eq!(
                payload,
                json!({"code": -32000, "message": "Repository not found", "data": {"repo": "x/y"}})
            );
        }
        other => panic!("expected RemoteTool, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Ready);
    session.close().await.unwrap();
}

#[tokio::test]
async fn slow_tool_times_out_and_session_survives() {
    let url = spawn(Fake::default()).await;
    let options = SessionOptions {
        call_timeout: Some(Duration::from_millis(100)),
    };
    let mut session = McpSession::open(HttpTransport::new(url, None), options)
        .await
        .unwrap();

    let err = session.call_tool("slow", Map::new()).await.unwrap_err();
    assert!(matches!(err, McpError::Timeout { .. }), "got {err:?}");
    assert_eq!(session.state(), SessionState::Ready);

    let inv = session
        .call_tool("ask_question", args(&[("repoName", "a/b")]))
        .await
        .unwrap();
    assert_eq!(inv.result.text(), "wiki for a/b");
    session.close().await.unwrap();
}

#[tokio::test]
async fn rejected_initialize_leaves_zero_handles() {
    let fake = Fake {
        reject_initialize: true,
        ..Fake::default()
    };
    let url = spawn(fake.clone()).await;
    let mut session = McpSession::new(HttpTransport::new(url, None), SessionOptions::default());

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, McpError::Handshake(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.handshake().is_none());
    assert_eq!(session.transport().open_handles(), 0);
    assert_eq!(fake.seen.lock().unwrap().methods, ["initialize"]);
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{addr}/mcp")).unwrap();
    let mut session = McpSession::new(HttpTransport::new(url, None), SessionOptions::default());
    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, McpError::Connection(_)), "got {err:?}");
    assert_eq!(session.transport().open_handles(), 0);
}

#[tokio::test]
async fn list_before_connect_sends_nothing() {
    let fake = Fake::default();
    let url = spawn(fake.clone()).await;
    let mut session = McpSession::new(HttpTransport::new(url, None), SessionOptions::default());

    assert!(matches!(session.list_tools().await, Err(McpError::NotConnected)));
    assert!(fake.seen.lock().unwrap().methods.is_empty());
}
