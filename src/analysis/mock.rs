//! Canned analysis served by `POST /analyze` until the agent pipeline is wired in.

use std::collections::BTreeMap;

use super::schema::{
    Analysis, EntryKind, FileInfo, GitHubIssueAnalysis, IssueSummary, KeySection,
};

fn file(score: f64, reason: &str, key_sections: Vec<KeySection>) -> FileInfo {
    FileInfo {
        kind: EntryKind::File,
        relevance_score: Some(score),
        reason: Some(reason.to_string()),
        key_sections,
        files: None,
    }
}

fn directory(score: f64, reason: &str, files: BTreeMap<String, FileInfo>) -> FileInfo {
    FileInfo {
        kind: EntryKind::Directory,
        relevance_score: Some(score),
        reason: Some(reason.to_string()),
        key_sections: Vec::new(),
        files: Some(files),
    }
}

pub fn mock_analysis() -> GitHubIssueAnalysis {
    let auth = BTreeMap::from([
        (
            "session.py".to_string(),
            file(
                0.95,
                "Creates and refreshes login sessions; the expiry check lives here",
                vec![KeySection {
                    line_start: 42,
                    line_end: 51,
                    code: "def is_expired(self):\n    return self.expires_at < time.time()".to_string(),
                    explanation: "Compares a UTC timestamp with local time, so sessions expire early in positive UTC offsets".to_string(),
                }],
            ),
        ),
        (
            "middleware.py".to_string(),
            file(
                0.7,
                "Calls the expiry check on every request and issues the logout redirect",
                vec![KeySection {
                    line_start: 18,
                    line_end: 27,
                    code: "if session.is_expired():\n    return redirect('/login')".to_string(),
                    explanation: "Entry point where users observe the unexpected logout".to_string(),
                }],
            ),
        ),
    ]);

    let tests = BTreeMap::from([(
        "test_session.py".to_string(),
        file(
            0.5,
            "Existing session tests only run with TZ=UTC and miss the bug",
            Vec::new(),
        ),
    )]);

    let relevant_files = BTreeMap::from([
        (
            "app".to_string(),
            directory(
                0.9,
                "Application package",
                BTreeMap::from([(
                    "auth".to_string(),
                    directory(0.9, "Authentication and session handling", auth),
                )]),
            ),
        ),
        (
            "tests".to_string(),
            directory(0.5, "Test suite", tests),
        ),
    ]);

    GitHubIssueAnalysis {
        issue_summary: IssueSummary {
            title: "Users are logged out early when the server runs outside UTC".to_string(),
            description: "Sessions expire several hours before their configured lifetime on hosts whose local timezone is ahead of UTC.".to_string(),
            labels: vec!["bug".to_string(), "auth".to_string()],
            status: "open".to_string(),
            assignees: vec!["octocat".to_string()],
        },
        relevant_files,
        analysis: Analysis {
            problem_type: "bug".to_string(),
            complexity: "low".to_string(),
            suggested_approach: "Store and compare session expiry as timezone-aware UTC datetimes, and run the session tests under several TZ values.".to_string(),
            dependencies: vec![
                "app/auth/session.py".to_string(),
                "app/auth/middleware.py".to_string(),
            ],
            tests_needed: vec![
                "Session created under TZ=Asia/Tokyo stays valid for its full lifetime".to_string(),
                "Session past its lifetime is rejected regardless of TZ".to_string(),
            ],
        },
    }
}
