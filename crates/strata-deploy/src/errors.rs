use std::fmt;

use serde::Serialize;
use strata_plan::{IssueKind, ValidationIssue, ValidationReport};
use thiserror::Error;

/// Problems found while building the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphError {
    #[error("line {line}: change '{change}' has invalid dependency '{dependency}'")]
    ReferenceSyntax {
        change: String,
        line: usize,
        dependency: String,
    },
    #[error("line {line}: change '{change}' depends on '{dependency}', which is not in the plan")]
    UnresolvedReference {
        change: String,
        line: usize,
        dependency: String,
    },
    #[error(
        "line {line}: change '{change}' depends on '{dependency}' ({target}), which is declared later"
    )]
    ForwardReference {
        change: String,
        line: usize,
        dependency: String,
        target: String,
    },
    #[error("dependency cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("line {line}: duplicate change name '{name}' (first declared on line {first_line})")]
    DuplicateChangeName {
        name: String,
        line: usize,
        first_line: usize,
    },
    #[error("line {line}: tag '@{tag}' has no preceding change")]
    OrphanTag { tag: String, line: usize },
}

impl GraphError {
    pub fn kind(&self) -> IssueKind {
        match self {
            GraphError::ReferenceSyntax { .. } => IssueKind::ReferenceSyntaxError,
            GraphError::UnresolvedReference { .. } => IssueKind::UnresolvedReference,
            GraphError::ForwardReference { .. } => IssueKind::ForwardReference,
            GraphError::Cycle { .. } => IssueKind::Cycle,
            GraphError::DuplicateChangeName { .. } => IssueKind::DuplicateChangeName,
            GraphError::OrphanTag { .. } => IssueKind::OrphanTag,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            GraphError::ReferenceSyntax { line, .. }
            | GraphError::UnresolvedReference { line, .. }
            | GraphError::ForwardReference { line, .. }
            | GraphError::DuplicateChangeName { line, .. }
            | GraphError::OrphanTag { line, .. } => Some(*line),
            GraphError::Cycle { .. } => None,
        }
    }

    /// Render as a report issue so graph and parse problems print alike.
    pub fn to_issue(&self) -> ValidationIssue {
        let message = match self.line() {
            Some(line) => {
                let text = self.to_string();
                let prefix = format!("line {line}: ");
                text.strip_prefix(&prefix).map(str::to_string).unwrap_or(text)
            }
            None => self.to_string(),
        };
        ValidationIssue::error(self.kind(), self.line(), message)
    }
}

/// Deployed state that disagrees with the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Divergence {
    /// Deployed changes that sit after the requested target.
    pub beyond_target: Vec<String>,
    /// Deployed changes the plan does not contain.
    pub unknown: Vec<String>,
    /// `(change, dependency)` pairs where a deployed change lacks a deployed dependency.
    pub missing_dependencies: Vec<(String, String)>,
}

impl Divergence {
    pub fn is_empty(&self) -> bool {
        self.beyond_target.is_empty()
            && self.unknown.is_empty()
            && self.missing_dependencies.is_empty()
    }

    pub fn to_issues(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for change in &self.beyond_target {
            issues.push(
                ValidationIssue::error(
                    IssueKind::Divergence,
                    None,
                    format!("change '{change}' is deployed beyond the target"),
                )
                .with_hint("revert it explicitly or deploy to a later target"),
            );
        }
        for change in &self.unknown {
            issues.push(ValidationIssue::error(
                IssueKind::Divergence,
                None,
                format!("deployed change '{change}' is not in the plan"),
            ));
        }
        for (change, dependency) in &self.missing_dependencies {
            issues.push(ValidationIssue::error(
                IssueKind::Divergence,
                None,
                format!("change '{change}' is deployed but its dependency '{dependency}' is not"),
            ));
        }
        issues
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.beyond_target.is_empty() {
            parts.push(format!("beyond target: {}", self.beyond_target.join(", ")));
        }
        if !self.unknown.is_empty() {
            parts.push(format!("not in plan: {}", self.unknown.join(", ")));
        }
        if !self.missing_dependencies.is_empty() {
            let pairs: Vec<String> = self
                .missing_dependencies
                .iter()
                .map(|(change, dependency)| format!("{change} (needs {dependency})"))
                .collect();
            parts.push(format!("missing dependencies: {}", pairs.join(", ")));
        }
        f.write_str(&parts.join("; "))
    }
}

/// Errors raised when a plan cannot be safely deployed.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("plan has {} error(s)", .0.errors.len())]
    InvalidPlan(ValidationReport),
    #[error("plan graph has {} error(s): {}", .0.len(), join_errors(.0))]
    Graph(Vec<GraphError>),
    #[error("cannot resolve revision '{0}'")]
    UnknownTarget(String),
    #[error("revision '{0}' belongs to another project")]
    ExternalTarget(String),
    #[error("change '{change}' depends on '{dependency}', which is outside the deployment slice")]
    IncompleteSlice { change: String, dependency: String },
    #[error("topological order would move change '{change}' away from its plan position")]
    Reordered { change: String },
    #[error("registry is for project '{registry}' but the plan is '{plan}'")]
    ProjectMismatch { plan: String, registry: String },
    #[error("registry diverges from plan: {0}")]
    Divergence(Divergence),
}

impl DeployError {
    /// Graph errors carried by this error, if any.
    pub fn graph_errors(&self) -> &[GraphError] {
        match self {
            DeployError::Graph(errors) => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[GraphError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for graph and planning operations.
pub type Result<T> = std::result::Result<T, DeployError>;
