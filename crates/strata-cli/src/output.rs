use std::path::Path;

use serde::Serialize;
use strata_deploy::{DeploymentPlan, RegistryDiff, RevertPlan};
use strata_plan::{ValidationIssue, ValidationReport};

use crate::CliError;

#[derive(Debug, Serialize)]
struct ReportOutput<'a> {
    plan: String,
    valid: bool,
    errors: &'a [ValidationIssue],
    warnings: &'a [ValidationIssue],
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_report(plan: &Path, report: &ValidationReport, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(&ReportOutput {
            plan: plan.display().to_string(),
            valid: report.is_ok(),
            errors: &report.errors,
            warnings: &report.warnings,
        });
    }

    for issue in report.errors.iter().chain(&report.warnings) {
        println!("{}: {issue}", plan.display());
    }
    if report.is_ok() {
        println!(
            "{}: ok ({} warning(s))",
            plan.display(),
            report.warnings.len()
        );
    }
    Ok(())
}

/// Print issues that stop a command before it produces output.
pub fn eprint_issues(plan: &Path, issues: &[ValidationIssue]) {
    for issue in issues {
        eprintln!("{}: {issue}", plan.display());
    }
}

pub fn print_deployment(plan: &DeploymentPlan, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(plan);
    }
    for (idx, change) in plan.changes.iter().enumerate() {
        println!("{:>4}. {change}", idx + 1);
    }
    Ok(())
}

pub fn print_diff(project: &str, diff: &RegistryDiff, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(diff);
    }
    match &diff.target {
        Some(target) => println!("project {project} (target {target})"),
        None => println!("project {project}"),
    }
    println!("deployed: {}", diff.deployed.len());
    println!("pending: {}", diff.pending.len());
    for change in &diff.pending {
        println!("  + {change}");
    }
    if !diff.modified.is_empty() {
        println!("modified since deployment:");
        for change in &diff.modified {
            println!("  ~ {change}");
        }
    }
    if diff.is_up_to_date() {
        println!("up to date");
    }
    Ok(())
}

pub fn print_revert(plan: &RevertPlan, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(plan);
    }
    if plan.changes.is_empty() {
        println!("nothing to revert after {}", plan.target);
    }
    for change in &plan.changes {
        println!("  - {change}");
    }
    Ok(())
}
