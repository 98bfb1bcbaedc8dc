/*!
 * Quality checks on extracted and translated text.
 *
 * - **Issues**: what a check found, where, and how bad it is
 * - **Characters**: allowed-characters patterns, corrupted encodings, charset coverage
 * - **Report**: serializable summary of all issues found in a batch
 *
 * Checks annotate the container they looked at and also return the issues,
 * so steps can both keep the annotations flowing downstream and build a report.
 */

pub mod characters;

pub use characters::{CharactersChecker, CharactersCheckerConfig};

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};

/// Type of a quality issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// A character is not allowed by a pattern or by the output charset
    AllowedCharacters,
    /// Text looks like the result of a wrong encoding round trip
    SuspectPattern,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueType::AllowedCharacters => write!(f, "allowed_characters"),
            IssueType::SuspectPattern => write!(f, "suspect_pattern"),
        }
    }
}

/// Severity of a quality issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Character span inside a text, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One problem found by a quality check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// What kind of problem this is
    pub issue_type: IssueType,

    /// How bad it is
    pub severity: Severity,

    /// Human readable description
    pub message: String,

    /// Id of the text unit the issue was found in
    pub text_unit_id: String,

    /// Offending span in the source text, if the issue is about the source
    pub source_span: Option<Span>,

    /// Offending span in the target text, if the issue is about the target
    pub target_span: Option<Span>,
}

impl Issue {
    /// Create an issue without position information
    pub fn new(issue_type: IssueType, severity: Severity, text_unit_id: &str, message: String) -> Self {
        Self {
            issue_type,
            severity,
            message,
            text_unit_id: text_unit_id.to_string(),
            source_span: None,
            target_span: None,
        }
    }

    pub fn with_source_span(mut self, span: Span) -> Self {
        self.source_span = Some(span);
        self
    }

    pub fn with_target_span(mut self, span: Span) -> Self {
        self.target_span = Some(span);
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (unit {}): {}",
            self.severity, self.issue_type, self.text_unit_id, self.message
        )
    }
}

/// Issues found for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentIssues {
    /// Name or path of the document
    pub document: String,

    /// Issues in document order
    pub issues: Vec<Issue>,
}

/// All issues found over a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCheckReport {
    /// Creation timestamp (RFC 3339)
    pub created_at: String,

    /// Per-document issues
    pub documents: Vec<DocumentIssues>,
}

impl Default for QualityCheckReport {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityCheckReport {
    pub fn new() -> Self {
        Self {
            created_at: Local::now().to_rfc3339(),
            documents: Vec::new(),
        }
    }

    /// Start collecting issues for a new document
    pub fn start_document(&mut self, document: &str) {
        self.documents.push(DocumentIssues {
            document: document.to_string(),
            issues: Vec::new(),
        });
    }

    /// Record an issue for the current document
    pub fn add(&mut self, issue: Issue) {
        if self.documents.is_empty() {
            self.start_document("");
        }
        if let Some(current) = self.documents.last_mut() {
            current.issues.push(issue);
        }
    }

    /// Total number of issues
    pub fn issue_count(&self) -> usize {
        self.documents.iter().map(|d| d.issues.len()).sum()
    }

    /// Number of issues of a given type
    pub fn count_of(&self, issue_type: IssueType) -> usize {
        self.issues().filter(|i| i.issue_type == issue_type).count()
    }

    /// Iterate over all issues
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.documents.iter().flat_map(|d| d.issues.iter())
    }

    /// Write the report as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize quality report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write quality report: {}", path.display()))?;
        Ok(())
    }
}
