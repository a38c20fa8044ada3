use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// Taxonomy shared by parse-time and graph-time problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Malformed line.
    SyntaxError,
    /// Illegal change or tag name.
    NameValidationError,
    /// Unparsable dependency or revision expression.
    ReferenceSyntaxError,
    UnresolvedReference,
    ForwardReference,
    Cycle,
    DuplicateChangeName,
    DuplicateTagName,
    OrphanTag,
    MissingPragma,
    PragmaPlacement,
    UnknownPragma,
    /// Registry and plan disagree.
    Divergence,
}

impl IssueKind {
    /// Stable snake_case code used in reports.
    pub fn code(self) -> &'static str {
        match self {
            IssueKind::SyntaxError => "syntax_error",
            IssueKind::NameValidationError => "name_validation_error",
            IssueKind::ReferenceSyntaxError => "reference_syntax_error",
            IssueKind::UnresolvedReference => "unresolved_reference",
            IssueKind::ForwardReference => "forward_reference",
            IssueKind::Cycle => "cycle",
            IssueKind::DuplicateChangeName => "duplicate_change_name",
            IssueKind::DuplicateTagName => "duplicate_tag_name",
            IssueKind::OrphanTag => "orphan_tag",
            IssueKind::MissingPragma => "missing_pragma",
            IssueKind::PragmaPlacement => "pragma_placement",
            IssueKind::UnknownPragma => "unknown_pragma",
            IssueKind::Divergence => "divergence",
        }
    }
}

/// Structured validation issue with location and hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    /// 1-based plan line, when the issue belongs to one.
    pub line: Option<usize>,
    pub message: String,
    pub hint: Option<String>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(
        severity: IssueSeverity,
        kind: IssueKind,
        line: Option<usize>,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            line,
            message: message.into(),
            hint,
        }
    }

    pub fn error(kind: IssueKind, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, kind, line, message, None)
    }

    pub fn warning(kind: IssueKind, line: Option<usize>, message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, kind, line, message, None)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {line}: ")?;
        }
        write!(f, "{} ({})", self.message, self.kind.code())?;
        if let Some(hint) = &self.hint {
            write!(f, "; hint: {hint}")?;
        }
        Ok(())
    }
}

/// Aggregated validation report with errors and warnings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Returns true when there are no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error issue.
    pub fn push_error(&mut self, issue: ValidationIssue) {
        self.errors.push(issue);
    }

    /// Add a warning issue.
    pub fn push_warning(&mut self, issue: ValidationIssue) {
        self.warnings.push(issue);
    }

    /// Add an issue to the list matching its severity.
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            IssueSeverity::Error => self.push_error(issue),
            IssueSeverity::Warning => self.push_warning(issue),
        }
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Errors of a given kind.
    pub fn errors_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().filter(move |issue| issue.kind == kind)
    }

    pub fn has_error(&self, kind: IssueKind) -> bool {
        self.errors_of(kind).next().is_some()
    }
}

/// Plan loading errors that are not line-level issues.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for plan operations.
pub type Result<T> = std::result::Result<T, PlanError>;
