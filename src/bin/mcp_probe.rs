// Command-line probe for an MCP server: connect, list tools, optionally call one.
//
//   MCP_SERVER_URL=https://mcp.deepwiki.com/mcp \
//   MCP_PROBE_TOOL=read_wiki_structure \
//   MCP_PROBE_ARGS='{"repoName":"microsoft/vscode"}' \
//   cargo run --bin mcp-probe

use anyhow::Context;
use serde_json::{Map, Value};

use issue_analyzer::config::McpConfig;
use issue_analyzer::mcp::{HttpTransport, McpSession, SessionOptions, filter_tools_by_prefix};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Everything is validated before the first request goes out.
    let config = McpConfig::from_env()?;
    let prefixes: Vec<String> = std::env::var("MCP_TOOL_PREFIXES")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let tool = std::env::var("MCP_PROBE_TOOL").ok().filter(|t| !t.is_empty());
    let args: Map<String, Value> = match std::env::var("MCP_PROBE_ARGS") {
        Ok(raw) => serde_json::from_str(&raw).context("MCP_PROBE_ARGS must be a JSON object")?,
        Err(_) => Map::new(),
    };

    let transport = HttpTransport::from_config(&config);
    let mut session = McpSession::open(transport, SessionOptions::from(&config))
        .await
        .with_context(|| format!("connecting to {}", config.server_url))?;

    let outcome = probe(&mut session, &prefixes, tool.as_deref(), args).await;
    if let Err(e) = session.close().await {
        tracing::warn!("close failed: {}", e);
    }
    outcome
}

async fn probe(
    session: &mut McpSession<HttpTransport>,
    prefixes: &[String],
    tool: Option<&str>,
    args: Map<String, Value>,
) -> anyhow::Result<()> {
    let tools = filter_tools_by_prefix(session.list_tools().await?, prefixes);
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    tracing::info!("connected to server with tools: {:?}", names);

    let Some(tool) = tool else {
        return Ok(());
    };
    let invocation = session.call_tool(tool, args).await?;
    tracing::info!(
        "tool call took {:.2} seconds",
        invocation.latency.as_secs_f64()
    );
    println!("{}", invocation.result.text());
    Ok(())
}
