use std::collections::HashSet;
use std::fmt::Write as _;

use strata_core::{Change, Plan, PlanEntry, Tag};

/// Plan text plus anything dropped while writing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedPlan {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Write a plan back to text.
///
/// Pragmas and entries are emitted in line order so a parsed plan reads back
/// identically. Later changes reusing an earlier name are dropped with a
/// warning.
pub fn serialize_plan(plan: &Plan) -> SerializedPlan {
    let mut lines: Vec<(usize, u8, String)> = Vec::with_capacity(plan.pragmas.len() + plan.entries.len());
    let mut warnings = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for pragma in &plan.pragmas {
        lines.push((pragma.line, 0, format!("%{}={}", pragma.name, pragma.value)));
    }

    for entry in &plan.entries {
        let text = match entry {
            PlanEntry::Change(change) => {
                if !seen.insert(change.name.as_str()) {
                    let warning = format!(
                        "dropped duplicate change '{}' on line {}",
                        change.name, change.line
                    );
                    tracing::warn!(
                        event = "duplicate_change_dropped",
                        change = %change.name,
                        line = change.line
                    );
                    warnings.push(warning);
                    continue;
                }
                change_line(change)
            }
            PlanEntry::Tag(tag) => tag_line(tag),
            PlanEntry::Comment { text, .. } => format!("#{text}"),
            PlanEntry::Blank { .. } => String::new(),
            PlanEntry::Invalid { raw, .. } => raw.clone(),
        };
        lines.push((entry.line(), 1, text));
    }

    lines.sort_by_key(|(line, rank, _)| (*line, *rank));

    let mut text = String::new();
    for (_, _, line) in lines {
        text.push_str(&line);
        text.push('\n');
    }

    SerializedPlan { text, warnings }
}

fn change_line(change: &Change) -> String {
    let mut line = change.name.clone();
    if !change.dependencies.is_empty() {
        let _ = write!(line, " [{}]", change.dependencies.join(" "));
    }
    let _ = write!(
        line,
        " {} {} <{}>",
        change.timestamp_string(),
        change.planner_name,
        change.planner_email
    );
    push_note(&mut line, &change.note);
    line
}

fn tag_line(tag: &Tag) -> String {
    let mut line = format!(
        "@{} {} {} <{}>",
        tag.name,
        tag.timestamp_string(),
        tag.planner_name,
        tag.planner_email
    );
    push_note(&mut line, &tag.note);
    line
}

fn push_note(line: &mut String, note: &str) {
    if !note.is_empty() {
        let _ = write!(line, " # {note}");
    }
}
