use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Pragma naming the plan syntax version.
pub const PRAGMA_SYNTAX_VERSION: &str = "syntax-version";
/// Pragma naming the owning project.
pub const PRAGMA_PROJECT: &str = "project";
/// Pragma naming the project URI.
pub const PRAGMA_URI: &str = "uri";

/// Parsed plan document for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Header pragmas in file order.
    pub pragmas: Vec<Pragma>,
    /// Entries after the header, in file order.
    pub entries: Vec<PlanEntry>,
}

/// `%name=value` header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Pragma {
    pub name: String,
    pub value: String,
    pub line: usize,
}

/// One line of a plan after the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanEntry {
    Change(Change),
    Tag(Tag),
    Comment { text: String, line: usize },
    Blank { line: usize },
    /// Malformed line kept so results stay line-addressable.
    Invalid {
        raw: String,
        line: usize,
        reason: String,
    },
}

/// A named schema modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Change {
    pub name: String,
    /// Raw dependency expressions, resolved lazily.
    pub dependencies: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub planner_name: String,
    pub planner_email: String,
    /// Trailing note; empty when absent.
    pub note: String,
    pub line: usize,
}

/// Checkpoint attached to the nearest preceding change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Tag {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub planner_name: String,
    pub planner_email: String,
    pub note: String,
    pub line: usize,
}

impl Change {
    /// Timestamp in the `YYYY-MM-DDTHH:MM:SSZ` plan form.
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

impl Tag {
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

impl PlanEntry {
    /// Line number of the entry (1-based).
    pub fn line(&self) -> usize {
        match self {
            PlanEntry::Change(change) => change.line,
            PlanEntry::Tag(tag) => tag.line,
            PlanEntry::Comment { line, .. }
            | PlanEntry::Blank { line }
            | PlanEntry::Invalid { line, .. } => *line,
        }
    }
}

impl Plan {
    /// Value of the first pragma named `name`.
    pub fn pragma(&self, name: &str) -> Option<&str> {
        self.pragmas
            .iter()
            .find(|pragma| pragma.name == name)
            .map(|pragma| pragma.value.as_str())
    }

    pub fn project(&self) -> Option<&str> {
        self.pragma(PRAGMA_PROJECT)
    }

    pub fn uri(&self) -> Option<&str> {
        self.pragma(PRAGMA_URI)
    }

    pub fn syntax_version(&self) -> Option<&str> {
        self.pragma(PRAGMA_SYNTAX_VERSION)
    }

    /// Replace the value of a pragma, appending it when missing.
    pub fn set_pragma(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pragmas.iter_mut().find(|pragma| pragma.name == name) {
            Some(pragma) => pragma.value = value,
            None => {
                let line = self.pragmas.len() + 1;
                self.pragmas.push(Pragma {
                    name: name.to_string(),
                    value,
                    line,
                });
            }
        }
    }

    /// Changes in plan order.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.entries.iter().filter_map(|entry| match entry {
            PlanEntry::Change(change) => Some(change),
            _ => None,
        })
    }

    /// Tags in plan order.
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.entries.iter().filter_map(|entry| match entry {
            PlanEntry::Tag(tag) => Some(tag),
            _ => None,
        })
    }

    /// First change named `name`.
    pub fn change(&self, name: &str) -> Option<&Change> {
        self.changes().find(|change| change.name == name)
    }

    /// Each tag paired with the change it is attached to.
    pub fn tag_attachments(&self) -> Vec<(&Tag, Option<&Change>)> {
        let mut current = None;
        let mut attachments = Vec::new();
        for entry in &self.entries {
            match entry {
                PlanEntry::Change(change) => current = Some(change),
                PlanEntry::Tag(tag) => attachments.push((tag, current)),
                _ => {}
            }
        }
        attachments
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
