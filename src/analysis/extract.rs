//! Turning free-text agent output into a [`GitHubIssueAnalysis`].
//!
//! The extractor is total: every input, including malformed or missing text,
//! yields a record. Failures become one of two placeholder records so callers
//! can tell "the agent said nothing" apart from "the agent said something we
//! could not read".

use std::collections::BTreeMap;

use super::schema::{Analysis, GitHubIssueAnalysis, IssueSummary, SchemaError};

pub const DEFAULT_EXCERPT_CHARS: usize = 500;
pub const TRUNCATION_MARKER: &str = "... [truncated]";

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

pub const FALLBACK_TITLE: &str = "Analysis unavailable";
pub const PARSE_FAILED_DESCRIPTION: &str = "Could not parse the agent response";
pub const NO_RESPONSE_DESCRIPTION: &str = "The agent produced no response";
const NO_RESPONSE_APPROACH: &str = "No response was produced.";
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No text at all (absent, empty, or whitespace only).
    NoResponse,
    /// The located JSON did not parse.
    InvalidJson,
    /// The JSON parsed but does not satisfy the schema.
    SchemaViolation,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NoResponse => "no_response",
            FallbackReason::InvalidJson => "invalid_json",
            FallbackReason::SchemaViolation => "schema_violation",
        }
    }
}

/// Outcome of reading one agent response.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Parsed(GitHubIssueAnalysis),
    Fallback {
        reason: FallbackReason,
        raw: String,
        record: GitHubIssueAnalysis,
    },
}

impl Extraction {
    pub fn record(&self) -> &GitHubIssueAnalysis {
        match self {
            Extraction::Parsed(r) => r,
            Extraction::Fallback { record, .. } => record,
        }
    }

    pub fn into_record(self) -> GitHubIssueAnalysis {
        match self {
            Extraction::Parsed(r) => r,
            Extraction::Fallback { record, .. } => record,
        }
    }

    pub fn fallback_reason(&self) -> Option<FallbackReason> {
        match self {
            Extraction::Parsed(_) => None,
            Extraction::Fallback { reason, .. } => Some(*reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback_reason().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extractor {
    excerpt_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXCERPT_CHARS)
    }
}

impl Extractor {
    /// `excerpt_chars` bounds how much raw text a parse-failure fallback keeps.
    pub fn new(excerpt_chars: usize) -> Self {
        Self { excerpt_chars }
    }

    pub fn excerpt_chars(&self) -> usize {
        self.excerpt_chars
    }

    pub fn parse(&self, raw: Option<&str>) -> Extraction {
        let raw = match raw {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::debug!("extract: empty agent response");
                return Extraction::Fallback {
                    reason: FallbackReason::NoResponse,
                    raw: raw.unwrap_or_default().to_string(),
                    record: no_response_record(),
                };
            }
        };

        match GitHubIssueAnalysis::from_json(locate_json(raw)) {
            Ok(record) => {
                for note in record.advisories() {
                    tracing::warn!("extract: {}", note);
                }
                Extraction::Parsed(record)
            }
            Err(e) => {
                let reason = match e {
                    SchemaError::Json(_) => FallbackReason::InvalidJson,
                    SchemaError::Shape(_) | SchemaError::RelevanceOutOfRange { .. } => {
                        FallbackReason::SchemaViolation
                    }
                };
                tracing::warn!(reason = reason.as_str(), "extract: falling back: {}", e);
                Extraction::Fallback {
                    reason,
                    raw: raw.to_string(),
                    record: parse_failed_record(raw, self.excerpt_chars),
                }
            }
        }
    }

    /// Always returns a record; see [`parse`](Self::parse) for the tagged form.
    pub fn extract(&self, raw: &str) -> GitHubIssueAnalysis {
        self.parse(Some(raw)).into_record()
    }
}

/// [`Extractor::extract`] with the default excerpt length.
pub fn extract(raw: &str) -> GitHubIssueAnalysis {
    Extractor::default().extract(raw)
}

/// Pick the substring to parse: the first ```` ```json ```` fence (up to the
/// next closing fence, or the end if unclosed), else the trimmed text when it
/// opens an object, else the text unchanged.
pub fn locate_json(raw: &str) -> &str {
    if let Some(start) = raw.find(FENCE_OPEN) {
        let body = &raw[start + FENCE_OPEN.len()..];
        let end = body.find(FENCE_CLOSE).unwrap_or(body.len());
        return &body[..end];
    }
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    raw
}

fn excerpt(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &raw[..cut], TRUNCATION_MARKER),
        None => raw.to_string(),
    }
}

fn placeholder(description: &str, suggested_approach: String) -> GitHubIssueAnalysis {
    GitHubIssueAnalysis {
        issue_summary: IssueSummary {
            title: FALLBACK_TITLE.to_string(),
            description: description.to_string(),
            labels: Vec::new(),
            status: UNKNOWN.to_string(),
            assignees: Vec::new(),
        },
        relevant_files: BTreeMap::new(),
        analysis: Analysis {
            problem_type: UNKNOWN.to_string(),
            complexity: UNKNOWN.to_string(),
            suggested_approach,
            dependencies: Vec::new(),
            tests_needed: Vec::new(),
        },
    }
}

fn parse_failed_record(raw: &str, max_chars: usize) -> GitHubIssueAnalysis {
    placeholder(PARSE_FAILED_DESCRIPTION, excerpt(raw, max_chars))
}

fn no_response_record() -> GitHubIssueAnalysis {
    placeholder(NO_RESPONSE_DESCRIPTION, NO_RESPONSE_APPROACH.to_string())
}
