use std::collections::HashMap;

use strata_core::{
    parse_reference, Plan, PRAGMA_PROJECT, PRAGMA_SYNTAX_VERSION, PRAGMA_URI,
};

use crate::errors::{IssueKind, ValidationIssue, ValidationReport};

const KNOWN_PRAGMAS: &[&str] = &[PRAGMA_SYNTAX_VERSION, PRAGMA_PROJECT, PRAGMA_URI];

/// Validate plan structure that does not need the dependency graph.
///
/// This checks:
/// - the header has pragmas (and names a project)
/// - change and tag names are unique
/// - every tag follows a change
/// - every dependency is a well-formed reference
pub fn validate_plan(plan: &Plan) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_pragmas(plan, &mut report);
    validate_change_names(plan, &mut report);
    validate_tags(plan, &mut report);
    validate_dependency_syntax(plan, &mut report);

    report
}

fn validate_pragmas(plan: &Plan, report: &mut ValidationReport) {
    if plan.pragmas.is_empty() {
        report.push_error(
            ValidationIssue::error(IssueKind::MissingPragma, None, "plan has no pragmas")
                .with_hint("start the plan with %syntax-version, %project and %uri"),
        );
        return;
    }

    if plan.project().is_none() {
        report.push_warning(
            ValidationIssue::warning(
                IssueKind::MissingPragma,
                None,
                "plan does not declare %project",
            )
            .with_hint("add %project=<name> to the header"),
        );
    }

    for pragma in &plan.pragmas {
        if !KNOWN_PRAGMAS.contains(&pragma.name.as_str()) {
            report.push_warning(ValidationIssue::warning(
                IssueKind::UnknownPragma,
                Some(pragma.line),
                format!("unknown pragma '%{}' kept as metadata", pragma.name),
            ));
        }
    }
}

fn validate_change_names(plan: &Plan, report: &mut ValidationReport) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for change in plan.changes() {
        if let Some(first_line) = seen.get(change.name.as_str()) {
            report.push_error(
                ValidationIssue::error(
                    IssueKind::DuplicateChangeName,
                    Some(change.line),
                    format!("duplicate change name '{}'", change.name),
                )
                .with_hint(format!("first declared on line {first_line}")),
            );
        } else {
            seen.insert(change.name.as_str(), change.line);
        }
    }
}

fn validate_tags(plan: &Plan, report: &mut ValidationReport) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for (tag, change) in plan.tag_attachments() {
        if change.is_none() {
            report.push_error(
                ValidationIssue::error(
                    IssueKind::OrphanTag,
                    Some(tag.line),
                    format!("tag '@{}' has no preceding change", tag.name),
                )
                .with_hint("move the tag below the change it marks"),
            );
        }

        if let Some(first_line) = seen.get(tag.name.as_str()) {
            report.push_error(
                ValidationIssue::error(
                    IssueKind::DuplicateTagName,
                    Some(tag.line),
                    format!("duplicate tag name '@{}'", tag.name),
                )
                .with_hint(format!("first declared on line {first_line}")),
            );
        } else {
            seen.insert(tag.name.as_str(), tag.line);
        }
    }
}

fn validate_dependency_syntax(plan: &Plan, report: &mut ValidationReport) {
    for change in plan.changes() {
        for dependency in &change.dependencies {
            if parse_reference(dependency).is_some() {
                continue;
            }
            let mut issue = ValidationIssue::error(
                IssueKind::ReferenceSyntaxError,
                Some(change.line),
                format!(
                    "change '{}' has invalid dependency '{}'",
                    change.name, dependency
                ),
            );
            if dependency.starts_with('!') {
                issue = issue.with_hint("conflict markers are not supported");
            }
            report.push_error(issue);
        }
    }
}
