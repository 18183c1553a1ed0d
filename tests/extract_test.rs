// Behaviour of the structured response extractor on agent-shaped input.

use issue_analyzer::analysis::extract::{
    FALLBACK_TITLE, NO_RESPONSE_DESCRIPTION, PARSE_FAILED_DESCRIPTION, TRUNCATION_MARKER,
};
use issue_analyzer::analysis::{
    extract, mock_analysis, Extraction, Extractor, FallbackReason, GitHubIssueAnalysis,
};
use serde_json::json;

fn valid_json() -> String {
    json!({
        "issue_summary": {
            "title": "Terminal freezes on paste",
            "description": "Pasting >1MB into the integrated terminal hangs the UI",
            "labels": ["bug", "terminal"],
            "status": "open",
            "assignees": ["alice", "bob"]
        },
        "relevant_files": {
            "src": {
                "type": "directory",
                "files": {
                    "terminal.ts": {
                        "type": "file",
                        "relevance_score": 0.8,
                        "reason": "paste handler",
                        "key_sections": [
                            {"line_start": 100, "line_end": 140, "code": "onPaste()", "explanation": "writes synchronously"}
                        ]
                    }
                }
            }
        },
        "analysis": {
            "problem_type": "bug",
            "complexity": "medium",
            "suggested_approach": "chunk the paste",
            "dependencies": ["xterm"],
            "tests_needed": ["paste 2MB"]
        }
    })
    .to_string()
}

#[test]
fn well_formed_json_round_trips() {
    let text = valid_json();
    let direct = GitHubIssueAnalysis::from_json(&text).unwrap();
    assert_eq!(extract(&text), direct);
    assert_eq!(direct.issue_summary.assignees, ["alice", "bob"]);

    let mock_text = serde_json::to_string_pretty(&mock_analysis()).unwrap();
    assert_eq!(extract(&mock_text), mock_analysis());
}

#[test]
fn fenced_block_is_extracted_and_prose_ignored() {
    let text = format!(
        "I looked at the repository. {{ this brace is prose }}\n\n```json\n{}\n```\n\nHope this helps! ```",
        valid_json()
    );
    let out = Extractor::default().parse(Some(&text));
    assert!(matches!(out, Extraction::Parsed(_)));
    assert_eq!(
        out.into_record(),
        GitHubIssueAnalysis::from_json(&valid_json()).unwrap()
    );
}

#[test]
fn malformed_json_yields_parse_failed_fallback() {
    for text in [
        "not json at all",
        "{\"issue_summary\": ",
        "```json\n{oops}\n```",
        "{} trailing",
    ] {
        let out = Extractor::default().parse(Some(text));
        assert_eq!(
            out.fallback_reason(),
            Some(FallbackReason::InvalidJson),
            "input: {text:?}"
        );
        assert_eq!(
            out.record().issue_summary.description,
            PARSE_FAILED_DESCRIPTION
        );
    }
}

#[test]
fn not_json_fallback_keeps_literal_input() {
    let record = extract("not json at all");
    assert_eq!(record.analysis.problem_type, "unknown");
    assert_eq!(record.analysis.complexity, "unknown");
    assert_eq!(record.analysis.suggested_approach, "not json at all");
    assert_eq!(record.issue_summary.title, FALLBACK_TITLE);
    assert_eq!(record.issue_summary.status, "unknown");
    assert!(record.relevant_files.is_empty());
}

#[test]
fn long_input_is_truncated_with_marker() {
    let text = "x".repeat(800);
    let record = extract(&text);
    let expected = format!("{}{}", "x".repeat(500), TRUNCATION_MARKER);
    assert_eq!(record.analysis.suggested_approach, expected);

    let exact = "y".repeat(500);
    assert_eq!(extract(&exact).analysis.suggested_approach, exact);
}

#[test]
fn schema_violations_fall_back() {
    let mut v: serde_json::Value = serde_json::from_str(&valid_json()).unwrap();
    v["relevant_files"]["src"]["files"]["terminal.ts"]["relevance_score"] = json!(-0.1);
    let out = Extractor::default().parse(Some(&v.to_string()));
    assert_eq!(out.fallback_reason(), Some(FallbackReason::SchemaViolation));

    let out = Extractor::default().parse(Some("{\"issue_summary\": {\"title\": 1}}"));
    assert_eq!(out.fallback_reason(), Some(FallbackReason::SchemaViolation));
    assert_eq!(out.record().issue_summary.description, PARSE_FAILED_DESCRIPTION);
}

#[test]
fn out_of_range_score_nested_under_a_file_falls_back() {
    let mut v: serde_json::Value = serde_json::from_str(&valid_json()).unwrap();
    v["relevant_files"]["src"]["files"]["terminal.ts"]["files"] = json!({
        "inner.ts": {"type": "file", "relevance_score": 7.5}
    });
    let out = Extractor::default().parse(Some(&v.to_string()));
    assert_eq!(out.fallback_reason(), Some(FallbackReason::SchemaViolation));
    assert_eq!(out.record().issue_summary.title, FALLBACK_TITLE);
}

#[test]
fn empty_input_yields_no_response_fallback() {
    let empty = extract("");
    let malformed = extract("garbage");
    assert_eq!(empty.issue_summary.description, NO_RESPONSE_DESCRIPTION);
    assert_ne!(empty, malformed);
    assert_eq!(
        Extractor::default().parse(Some("")).fallback_reason(),
        Some(FallbackReason::NoResponse)
    );
}

#[test]
fn extraction_is_deterministic() {
    let valid = valid_json();
    for text in ["", "garbage", valid.as_str()] {
        assert_eq!(extract(text), extract(text));
    }
}

#[test]
fn inverted_line_range_is_accepted() {
    let mut v: serde_json::Value = serde_json::from_str(&valid_json()).unwrap();
    v["relevant_files"]["src"]["files"]["terminal.ts"]["key_sections"][0]["line_end"] = json!(1);
    let out = Extractor::default().parse(Some(&v.to_string()));
    assert!(!out.is_fallback());
    assert_eq!(out.record().advisories().len(), 1);
}
