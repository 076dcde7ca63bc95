//! Parsing analyzer responses into findings.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::errors::{Result, ReviewError};
use crate::findings::{Category, Finding, Severity};

// A whole response wrapped in one ``` fence, optional language tag.
static FENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").unwrap());

/// One element of the JSON array the prompt asks for.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFinding {
    #[serde(default)]
    line_number: Option<serde_json::Value>,
    issue_title: String,
    description: String,
    severity: String,
    category: String,
}

/// Strip a surrounding markdown code fence, if the whole text is fenced.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match FENCE_REGEX.captures(trimmed).and_then(|c| c.get(2)) {
        Some(inner) if !inner.as_str().trim().is_empty() => inner.as_str().trim(),
        _ => trimmed,
    }
}

/// Parse the analyzer's response text into findings for `file_path`.
///
/// `[]` is a valid answer and yields no findings.
pub fn parse_findings(text: &str, file_path: &str) -> Result<Vec<Finding>> {
    let json = strip_code_fence(text);
    if json.is_empty() {
        return Err(ReviewError::Analysis(
            "Analyzer returned an empty response".to_string(),
        ));
    }

    let raw: Vec<RawFinding> = serde_json::from_str(json).map_err(|e| {
        ReviewError::Analysis(format!("Analyzer response is not a valid findings array: {}", e))
    })?;

    raw.into_iter()
        .map(|r| {
            let severity: Severity = r.severity.parse()?;
            let category: Category = r.category.parse()?;
            let finding = Finding::new(file_path, r.issue_title, r.description, severity, category);
            Ok(match line_number_text(r.line_number) {
                Some(line) => finding.with_line_number(line),
                None => finding,
            })
        })
        .collect()
}

// Models sometimes answer with a bare number instead of the requested string.
fn line_number_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
