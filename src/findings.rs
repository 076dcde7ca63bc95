//! Review findings and per-file report types.
//!
//! ## Types
//!
//! - [`Severity`]: Severity classification for a finding
//! - [`Category`]: Concern area a finding belongs to
//! - [`Finding`]: A single issue reported by the analyzer for one file
//! - [`FileStatus`]: Lifecycle state of a file inside a batch
//! - [`FileReport`]: The orchestrator's mutable record for one file
//! - [`IssueDraft`]: Title, body and labels for a forge issue built from a finding
//!
//! ## Example
//!
//! ```
//! use repolens::findings::{Category, Finding, IssueDraft, Severity};
//!
//! let finding = Finding::new(
//!     "src/db.rs",
//!     "SQL built by string concatenation",
//!     "User input flows into the query text.",
//!     Severity::High,
//!     Category::Security,
//! )
//! .with_line_number("42");
//!
//! let draft = IssueDraft::from_finding(&finding);
//! assert_eq!(draft.labels, vec!["Security".to_string(), "High".to_string()]);
//! assert!(draft.body.contains("**Approx. Line:** 42"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ReviewError;

const ANALYSIS_FAILURE_PREFIX: &str = "Failed to analyze code.";

/// Severity level for findings, ordered from most to least critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Informational,
    ];

    /// Check whether this severity is at least as severe as `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens::findings::Severity;
    ///
    /// assert!(Severity::Critical.is_at_least(Severity::High));
    /// assert!(Severity::High.is_at_least(Severity::High));
    /// assert!(!Severity::Low.is_at_least(Severity::Medium));
    /// ```
    pub fn is_at_least(&self, threshold: Severity) -> bool {
        *self <= threshold
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Informational => "Informational",
        }
    }

    /// Get the emoji indicator for this severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Critical => "🔴",
            Self::High => "🟠",
            Self::Medium => "🟡",
            Self::Low => "🔵",
            Self::Informational => "⚪",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ReviewError::Analysis(format!(
                    "Invalid severity '{}'. Valid values: Critical, High, Medium, Low, Informational",
                    s
                ))
            })
    }
}

/// Concern area of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Performance,
    Security,
    Integrity,
    Scalability,
    Maintainability,
    BestPractice,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Self::Performance,
        Self::Security,
        Self::Integrity,
        Self::Scalability,
        Self::Maintainability,
        Self::BestPractice,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "Performance",
            Self::Security => "Security",
            Self::Integrity => "Integrity",
            Self::Scalability => "Scalability",
            Self::Maintainability => "Maintainability",
            Self::BestPractice => "BestPractice",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cat| cat.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ReviewError::Analysis(format!(
                    "Invalid category '{}'. Valid values: Performance, Security, Integrity, \
                     Scalability, Maintainability, BestPractice, Other",
                    s
                ))
            })
    }
}

/// A single issue reported by the analyzer for one file.
///
/// Read-only once created; the `id` is unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    id: String,
    file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    line_number: Option<String>,
    title: String,
    description: String,
    severity: Severity,
    category: Category,
}

impl Finding {
    /// Create a finding with a freshly generated id.
    pub fn new(
        file_path: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        category: Category,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.into(),
            line_number: None,
            title: title.into(),
            description: description.into(),
            severity,
            category,
        }
    }

    /// Set the approximate line number. Blank strings leave it absent.
    pub fn with_line_number(mut self, line: impl Into<String>) -> Self {
        let line = line.into();
        self.line_number = if line.trim().is_empty() {
            None
        } else {
            Some(line.trim().to_string())
        };
        self
    }

    /// Build the synthetic finding recorded when analysis of a file fails.
    pub fn analysis_failure(file_path: impl Into<String>, error: &ReviewError) -> Self {
        let details = error.to_string();
        let description = if details.starts_with(ANALYSIS_FAILURE_PREFIX) {
            details
        } else {
            format!("{} Details: {}", ANALYSIS_FAILURE_PREFIX, details)
        };
        Self::new(
            file_path,
            "Analysis Failed",
            description,
            Severity::Critical,
            Category::Other,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn line_number(&self) -> Option<&str> {
        self.line_number.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// `file:line` or just `file`.
    pub fn location(&self) -> String {
        match &self.line_number {
            Some(line) => format!("{}:{}", self.file_path, line),
            None => self.file_path.clone(),
        }
    }
}

/// Lifecycle state of a file inside a batch.
///
/// Transitions are monotonic: `Pending -> Analyzing -> (Analyzed | Failed)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Pending,
    Analyzing,
    Analyzed,
    Failed,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Analyzed | Self::Failed)
    }

    /// Check whether moving from `self` to `next` respects the lifecycle.
    ///
    /// # Examples
    ///
    /// ```
    /// use repolens::findings::FileStatus;
    ///
    /// assert!(FileStatus::Pending.can_advance_to(FileStatus::Analyzing));
    /// assert!(!FileStatus::Pending.can_advance_to(FileStatus::Analyzed));
    /// assert!(!FileStatus::Failed.can_advance_to(FileStatus::Pending));
    /// ```
    pub fn can_advance_to(&self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Analyzing)
                | (Self::Analyzing, Self::Analyzed)
                | (Self::Analyzing, Self::Failed)
        )
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Analyzing => "analyzing",
            Self::Analyzed => "analyzed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The orchestrator's record for one file of the current batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    file_path: String,
    status: FileStatus,
    findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl FileReport {
    /// Create a report in `Pending`.
    pub fn pending(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            status: FileStatus::Pending,
            findings: Vec::new(),
            error_message: None,
        }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub(crate) fn mark_analyzing(&mut self) -> Result<(), ReviewError> {
        self.advance(FileStatus::Analyzing)
    }

    pub(crate) fn mark_analyzed(&mut self, findings: Vec<Finding>) -> Result<(), ReviewError> {
        self.advance(FileStatus::Analyzed)?;
        self.findings = findings;
        Ok(())
    }

    pub(crate) fn mark_failed(
        &mut self,
        message: impl Into<String>,
        findings: Vec<Finding>,
    ) -> Result<(), ReviewError> {
        self.advance(FileStatus::Failed)?;
        self.error_message = Some(message.into());
        self.findings = findings;
        Ok(())
    }

    fn advance(&mut self, next: FileStatus) -> Result<(), ReviewError> {
        if !self.status.can_advance_to(next) {
            return Err(ReviewError::Validation(format!(
                "Illegal status transition for {}: {} -> {}",
                self.file_path, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

const ISSUE_FOOTER: &str = "*This issue was auto-generated by repolens.*";

/// Title, body and labels for a forge issue created from a finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

impl IssueDraft {
    /// Format an issue from a finding. The "Approx. Line" section is omitted
    /// entirely when the finding has no line number.
    pub fn from_finding(finding: &Finding) -> Self {
        let title = format!("[CodeReview] {} ({})", finding.title(), finding.file_path());

        let mut body = format!("**File:** `{}`\n\n", finding.file_path());
        body.push_str(&format!("**Severity:** {}\n", finding.severity()));
        body.push_str(&format!("**Category:** {}\n\n", finding.category()));
        if let Some(line) = finding.line_number() {
            body.push_str(&format!("**Approx. Line:** {}\n\n", line));
        }
        body.push_str(&format!("**Description:**\n{}\n\n", finding.description()));
        body.push_str(ISSUE_FOOTER);

        Self {
            title,
            body,
            labels: vec![
                finding.category().to_string(),
                finding.severity().to_string(),
            ],
        }
    }
}
