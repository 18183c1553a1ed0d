//! Issue analysis record, the extractor that reads it out of agent output,
//! and the canned value served while the agent pipeline is stubbed.

pub mod extract;
pub mod issue_ref;
pub mod mock;
pub mod schema;

pub use extract::{
    DEFAULT_EXCERPT_CHARS, Extraction, Extractor, FallbackReason, extract, locate_json,
};
pub use issue_ref::{IssueRef, IssueUrlError};
pub use mock::mock_analysis;
pub use schema::{
    Analysis, EntryKind, FileInfo, FlattenedFile, GitHubIssueAnalysis, IssueSummary, KeySection,
    SchemaError,
};
