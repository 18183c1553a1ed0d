// Process configuration, read once from the environment at startup and passed
// into constructors. Nothing here is cached globally.

use std::env;
use std::time::Duration;

use url::Url;

use crate::analysis::DEFAULT_EXCERPT_CHARS;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

// ── HTTP server ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Characters of raw agent output kept in a parse-failure fallback.
    pub excerpt_chars: usize,
    /// Origins allowed by CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production,
    /// a map in tests).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cors_origins = match get("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            excerpt_chars: parse_or(&get, "FALLBACK_EXCERPT_CHARS", defaults.excerpt_chars)?,
            cors_origins,
        })
    }
}

// ── MCP client ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct McpConfig {
    pub server_url: Url,
    pub auth_token: Option<String>,
    /// `None` when `MCP_TIMEOUT_SECS=0`.
    pub call_timeout: Option<Duration>,
}

impl McpConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = get("MCP_SERVER_URL")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing {
                var: "MCP_SERVER_URL",
            })?;
        let server_url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            var: "MCP_SERVER_URL",
            reason: e.to_string(),
        })?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "MCP_SERVER_URL",
                reason: format!("unsupported scheme '{}'", server_url.scheme()),
            });
        }

        let timeout_secs: u64 = parse_or(&get, "MCP_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;

        Ok(Self {
            server_url,
            auth_token: get("MCP_AUTH_TOKEN").filter(|t| !t.is_empty()),
            call_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
