//! The issue analysis record agents are asked to produce.
//!
//! Required fields must be present and correctly typed; unknown fields are
//! ignored. Collections marked `default` may be omitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GitHubIssueAnalysis {
    pub issue_summary: IssueSummary,
    /// Path segment name -> node. Directories nest further nodes under `files`.
    pub relevant_files: BTreeMap<String, FileInfo>,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueSummary {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// `open` / `closed` (or `unknown` in a fallback record).
    pub status: String,
    #[serde(default)]
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FileInfo {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// In `[0.0, 1.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key_sections: Vec<KeySection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub files: Option<BTreeMap<String, FileInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct KeySection {
    pub line_start: i64,
    pub line_end: i64,
    pub code: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Analysis {
    /// bug / feature / enhancement
    pub problem_type: String,
    /// low / medium / high
    pub complexity: String,
    pub suggested_approach: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tests_needed: Vec<String>,
}

/// Agents sometimes emit `"key_sections": null`; treat it like an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Validation ──────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("does not match the analysis schema: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("relevance_score {value} at '{path}' is outside [0.0, 1.0]")]
    RelevanceOutOfRange { path: String, value: f64 },
}

impl GitHubIssueAnalysis {
    /// Parse and validate a JSON document. Constraint violations (such as an
    /// out-of-range relevance score) are errors; see [`advisories`](Self::advisories)
    /// for the checks that are only reported.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let value: serde_json::Value = serde_json::from_str(text).map_err(SchemaError::Json)?;
        let record: Self = serde_json::from_value(value).map_err(SchemaError::Shape)?;
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        walk(&self.relevant_files, "", false, &mut |path: &str, info: &FileInfo| {
            match info.relevance_score {
                Some(value) if !(0.0..=1.0).contains(&value) => {
                    Err(SchemaError::RelevanceOutOfRange {
                        path: path.to_string(),
                        value,
                    })
                }
                _ => Ok(()),
            }
        })
    }

    /// Soft findings that do not reject the record: key sections whose
    /// `line_start` is after `line_end`.
    pub fn advisories(&self) -> Vec<String> {
        let mut found = Vec::new();
        let _ = walk(&self.relevant_files, "", false, &mut |path: &str, info: &FileInfo| {
            for s in &info.key_sections {
                if s.line_start > s.line_end {
                    found.push(format!(
                        "{path}: key section starts at line {} but ends at line {}",
                        s.line_start, s.line_end
                    ));
                }
            }
            Ok::<(), SchemaError>(())
        });
        found
    }

    /// Files (not directories) that carry a reason, with their full `/`-joined
    /// path, depth first in key order.
    pub fn flattened_files(&self) -> Vec<FlattenedFile> {
        let mut out = Vec::new();
        let _ = walk(&self.relevant_files, "", true, &mut |path: &str, info: &FileInfo| {
            if info.kind == EntryKind::File {
                if let Some(reason) = &info.reason {
                    out.push(FlattenedFile {
                        path: path.to_string(),
                        reason: reason.clone(),
                        key_sections: info.key_sections.clone(),
                    });
                }
            }
            Ok::<(), SchemaError>(())
        });
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FlattenedFile {
    pub path: String,
    pub reason: String,
    pub key_sections: Vec<KeySection>,
}

/// Pre-order walk over a file tree. With `directories_only`, `files` nested
/// under a `file` node are skipped; otherwise every nested node is visited.
fn walk<E>(
    nodes: &BTreeMap<String, FileInfo>,
    base: &str,
    directories_only: bool,
    visit: &mut impl FnMut(&str, &FileInfo) -> Result<(), E>,
) -> Result<(), E> {
    for (name, info) in nodes {
        let path = if base.is_empty() {
            name.clone()
        } else {
            format!("{base}/{name}")
        };
        visit(&path, info)?;
        if directories_only && info.kind != EntryKind::Directory {
            continue;
        }
        if let Some(children) = &info.files {
            walk(children, &path, directories_only, visit)?;
        }
    }
    Ok(())
}
