use chrono::{DateTime, Utc};
use serde::Serialize;
use toml::Value;

use crate::loader::Category;

/// How strongly a validation issue should influence automated repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational finding, reported as a warning.
    Low,
    /// Constraint violation worth surfacing but not repair-driving.
    Medium,
    /// Serious violation likely to degrade behavior.
    High,
    /// Violation that triggers automatic repair when enabled.
    Critical,
}

/// The kind of constraint a validation issue violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    /// A `required` key is absent.
    MissingField,
    /// The value's type does not match the schema.
    TypeMismatch,
    /// The value is not one of the declared `enum` members.
    EnumViolation,
    /// The value does not match a declared regex pattern.
    PatternViolation,
    /// The value falls outside `minimum`/`maximum`.
    RangeViolation,
    /// A category-specific rule over multiple fields failed.
    CrossFieldViolation,
    /// The document carries a key the schema does not declare.
    UnknownField,
    /// The validator itself failed; reported instead of raised.
    ValidationError,
}

impl IssueKind {
    /// The severity derived from the violated constraint kind.
    ///
    /// Cross-field rules override this with the severity their author
    /// chose.
    pub fn default_severity(self) -> Severity {
        match self {
            IssueKind::MissingField | IssueKind::ValidationError => Severity::Critical,
            IssueKind::TypeMismatch | IssueKind::EnumViolation => Severity::High,
            IssueKind::PatternViolation | IssueKind::RangeViolation => Severity::Medium,
            IssueKind::CrossFieldViolation | IssueKind::UnknownField => Severity::Low,
        }
    }
}

/// A single validation finding at a specific field path.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    /// Category the finding belongs to.
    pub category: Category,
    /// Fully qualified dot path, starting with the category name.
    pub path: String,
    /// The violated constraint kind.
    pub kind: IssueKind,
    /// Human-readable description of what was expected.
    pub expected: String,
    /// The offending value, when one was present.
    pub actual: Option<Value>,
    /// Complete message for logs and reports.
    pub message: String,
    /// Ranking used by automated repair decisions.
    pub severity: Severity,
}

impl ValidationIssue {
    /// Creates an issue with the severity derived from its kind.
    pub fn new(
        category: Category,
        path: String,
        kind: IssueKind,
        expected: String,
        actual: Option<Value>,
    ) -> Self {
        let message = match &actual {
            Some(value) => format!("{path}: expected {expected}, got {value}"),
            None => format!("{path}: expected {expected}"),
        };

        Self {
            category,
            path,
            kind,
            expected,
            actual,
            message,
            severity: kind.default_severity(),
        }
    }

    /// Overrides the derived severity, used by cross-field rules.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// The outcome of validating one category document.
///
/// Always produced, never raised: internal validator failures are folded
/// into the issue list as a single critical `ValidationError` finding.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Category the report covers.
    pub category: Category,
    /// True iff `issues` is empty; warnings never flip validity.
    pub is_valid: bool,
    /// Medium-and-above findings.
    pub issues: Vec<ValidationIssue>,
    /// Low-severity findings, tracked separately.
    pub warnings: Vec<ValidationIssue>,
    /// Dot paths repaired by `apply_fallbacks`, filled in by the caller
    /// that performed the repair.
    pub fallback_applied: Vec<String>,
    /// When the validation ran.
    pub timestamp: DateTime<Utc>,
}

impl ValidationReport {
    /// Builds a report from raw findings, partitioning low-severity ones
    /// into `warnings`.
    pub fn from_findings(category: Category, findings: Vec<ValidationIssue>) -> Self {
        let (warnings, issues): (Vec<_>, Vec<_>) = findings
            .into_iter()
            .partition(|issue| issue.severity == Severity::Low);

        Self {
            category,
            is_valid: issues.is_empty(),
            issues,
            warnings,
            fallback_applied: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Whether the report carries at least one critical issue.
    pub fn has_critical(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == Severity::Critical)
    }
}
