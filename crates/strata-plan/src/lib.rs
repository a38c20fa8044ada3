//! Plan parsing and structural validation.
//!
//! Turns plan text into a [`strata_core::Plan`] while accumulating every
//! line-level and structural problem in a [`ValidationReport`].

pub mod errors;
pub mod parser;
pub mod validate;

pub use errors::{
    IssueKind, IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport,
};
pub use parser::{classify_line, parse_plan, parse_plan_file, LineKind, ParsedPlan};
pub use validate::validate_plan;
