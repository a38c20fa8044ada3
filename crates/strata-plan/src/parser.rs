//! Line-oriented plan parser.
//!
//! Every line is classified into exactly one [`LineKind`] by an ordered
//! cascade of predicates, then decoded. Malformed lines become
//! [`PlanEntry::Invalid`] entries plus a report issue; parsing never aborts.

use std::path::Path;

use chrono::{DateTime, Utc};
use strata_core::{is_valid_change_name, is_valid_tag_name, Change, Plan, PlanEntry, Pragma, Tag};

use crate::errors::{IssueKind, PlanError, ValidationIssue, ValidationReport};
use crate::validate::validate_plan;

/// Plan data with every problem found while reading it.
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub plan: Plan,
    pub report: ValidationReport,
}

impl ParsedPlan {
    /// True when the plan has no line or structural errors.
    pub fn is_valid(&self) -> bool {
        self.report.is_ok()
    }
}

/// Classification of a single plan line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Blank,
    /// Text after the `#`.
    Comment(&'a str),
    /// Text after the `%`.
    Pragma(&'a str),
    /// Text after the `@`.
    Tag(&'a str),
    Change(&'a str),
    Invalid { kind: IssueKind, reason: &'static str },
}

/// Classify a line. `header_open` is true until the first change or tag.
pub fn classify_line(raw: &str, header_open: bool) -> LineKind<'_> {
    let text = raw.trim();
    if text.is_empty() {
        return LineKind::Blank;
    }
    if let Some(comment) = text.strip_prefix('#') {
        return LineKind::Comment(comment);
    }
    if text.ends_with('\\') {
        return LineKind::Invalid {
            kind: IssueKind::SyntaxError,
            reason: "multi-line values are not supported",
        };
    }
    if let Some(pragma) = text.strip_prefix('%') {
        if !header_open {
            return LineKind::Invalid {
                kind: IssueKind::PragmaPlacement,
                reason: "pragmas must precede the first change",
            };
        }
        return LineKind::Pragma(pragma);
    }
    if let Some(tag) = text.strip_prefix('@') {
        return LineKind::Tag(tag);
    }
    if text.starts_with('[') {
        return LineKind::Invalid {
            kind: IssueKind::SyntaxError,
            reason: "invalid line format",
        };
    }
    LineKind::Change(text)
}

/// Parse plan text into entries plus an accumulated report.
pub fn parse_plan(text: &str) -> ParsedPlan {
    let mut plan = Plan::default();
    let mut report = ValidationReport::default();
    let mut header_open = true;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let entry = match classify_line(raw, header_open) {
            LineKind::Blank => PlanEntry::Blank { line },
            LineKind::Comment(comment) => PlanEntry::Comment {
                text: comment.to_string(),
                line,
            },
            LineKind::Pragma(body) => match parse_pragma(body, line) {
                Ok(pragma) => {
                    plan.pragmas.push(pragma);
                    continue;
                }
                Err(err) => invalid_entry(raw, line, err, &mut report),
            },
            LineKind::Tag(body) => {
                header_open = false;
                match parse_tag(body, line) {
                    Ok(tag) => PlanEntry::Tag(tag),
                    Err(err) => invalid_entry(raw, line, err, &mut report),
                }
            }
            LineKind::Change(body) => {
                header_open = false;
                match parse_change(body, line) {
                    Ok(change) => PlanEntry::Change(change),
                    Err(err) => invalid_entry(raw, line, err, &mut report),
                }
            }
            LineKind::Invalid { kind, reason } => invalid_entry(
                raw,
                line,
                LineError::new(kind, reason.to_string()),
                &mut report,
            ),
        };
        plan.entries.push(entry);
    }

    report.merge(validate_plan(&plan));

    tracing::debug!(
        event = "plan_parsed",
        changes = plan.changes().count(),
        tags = plan.tags().count(),
        errors = report.errors.len(),
        warnings = report.warnings.len()
    );

    ParsedPlan { plan, report }
}

/// Read and parse a plan file.
pub fn parse_plan_file(path: &Path) -> Result<ParsedPlan, PlanError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_plan(&text))
}

#[derive(Debug)]
struct LineError {
    kind: IssueKind,
    message: String,
}

impl LineError {
    fn new(kind: IssueKind, message: String) -> Self {
        Self { kind, message }
    }

    fn syntax(message: impl Into<String>) -> Self {
        Self::new(IssueKind::SyntaxError, message.into())
    }
}

fn invalid_entry(
    raw: &str,
    line: usize,
    err: LineError,
    report: &mut ValidationReport,
) -> PlanEntry {
    report.push_error(ValidationIssue::error(err.kind, Some(line), err.message.clone()));
    PlanEntry::Invalid {
        raw: raw.to_string(),
        line,
        reason: err.message,
    }
}

fn parse_pragma(body: &str, line: usize) -> Result<Pragma, LineError> {
    let Some((name, value)) = body.split_once('=') else {
        return Err(LineError::syntax(format!("invalid pragma '%{body}'")));
    };
    let name = name.trim();
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(LineError::syntax(format!("invalid pragma name '{name}'")));
    }
    Ok(Pragma {
        name: name.to_string(),
        value: value.trim().to_string(),
        line,
    })
}

fn parse_change(body: &str, line: usize) -> Result<Change, LineError> {
    let name_end = body
        .find(|ch: char| ch.is_whitespace() || ch == '[')
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if !is_valid_change_name(name) {
        return Err(LineError::new(
            IssueKind::NameValidationError,
            format!("invalid change name '{name}'"),
        ));
    }

    let mut rest = body[name_end..].trim_start();
    let mut dependencies = Vec::new();
    if let Some(list) = rest.strip_prefix('[') {
        let Some(close) = list.find(']') else {
            return Err(LineError::syntax("unterminated dependency list"));
        };
        dependencies = list[..close]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        rest = list[close + 1..].trim_start();
    }

    let meta = parse_metadata(rest)?;
    Ok(Change {
        name: name.to_string(),
        dependencies,
        timestamp: meta.timestamp,
        planner_name: meta.planner_name,
        planner_email: meta.planner_email,
        note: meta.note,
        line,
    })
}

fn parse_tag(body: &str, line: usize) -> Result<Tag, LineError> {
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    let name = &body[..name_end];
    if !is_valid_tag_name(name) {
        return Err(LineError::new(
            IssueKind::NameValidationError,
            format!("invalid tag name '{name}'"),
        ));
    }

    let meta = parse_metadata(body[name_end..].trim_start())?;
    Ok(Tag {
        name: name.to_string(),
        timestamp: meta.timestamp,
        planner_name: meta.planner_name,
        planner_email: meta.planner_email,
        note: meta.note,
        line,
    })
}

struct Metadata {
    timestamp: DateTime<Utc>,
    planner_name: String,
    planner_email: String,
    note: String,
}

/// Decode `timestamp planner name <email> # note`.
fn parse_metadata(text: &str) -> Result<Metadata, LineError> {
    if text.is_empty() {
        return Err(LineError::syntax("missing timestamp"));
    }
    let Some(open) = text.find('<') else {
        return Err(LineError::syntax("missing planner email"));
    };
    let Some(close_offset) = text[open..].find('>') else {
        return Err(LineError::syntax("unterminated planner email"));
    };
    let close = open + close_offset;

    let head = text[..open].trim();
    let (raw_timestamp, planner_name) = match head.split_once(char::is_whitespace) {
        Some((timestamp, planner)) => (timestamp, planner.trim()),
        None => (head, ""),
    };
    if raw_timestamp.is_empty() {
        return Err(LineError::syntax("missing timestamp"));
    }
    let timestamp = DateTime::parse_from_rfc3339(raw_timestamp)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| LineError::syntax(format!("invalid timestamp '{raw_timestamp}'")))?;
    if planner_name.is_empty() {
        return Err(LineError::syntax("missing planner name"));
    }

    let planner_email = text[open + 1..close].trim();
    if planner_email.is_empty() {
        return Err(LineError::syntax("missing planner email"));
    }

    let tail = text[close + 1..].trim();
    let note = if tail.is_empty() {
        String::new()
    } else if let Some(note) = tail.strip_prefix('#') {
        note.trim().to_string()
    } else {
        return Err(LineError::syntax(format!(
            "unexpected text after planner email: '{tail}'"
        )));
    };

    Ok(Metadata {
        timestamp,
        planner_name: planner_name.to_string(),
        planner_email: planner_email.to_string(),
        note,
    })
}
