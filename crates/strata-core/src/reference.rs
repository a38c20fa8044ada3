//! Grammar for dependency and revision expressions.
//!
//! A reference names a change by plain name, tag, `change@tag`, content hash,
//! symbol (`HEAD`/`ROOT`) or a position relative to another reference, and may
//! be qualified with a `project:` prefix pointing into another plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::names::{is_valid_change_name, is_valid_tag_name};

/// Length of a hex-encoded change id.
pub const CHANGE_ID_LEN: usize = 40;

/// Symbolic positions within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    /// The last change in the plan.
    Head,
    /// The first change in the plan.
    Root,
}

impl Symbol {
    fn from_name(value: &str) -> Option<Self> {
        match value {
            "HEAD" => Some(Symbol::Head),
            "ROOT" => Some(Symbol::Root),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::Head => "HEAD",
            Symbol::Root => "ROOT",
        }
    }
}

/// Walk direction for relative references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `^`: parents through declared dependencies.
    Caret,
    /// `~`: ancestors through plan order.
    Tilde,
}

impl Direction {
    fn from_symbol(ch: char) -> Option<Self> {
        match ch {
            '^' => Some(Direction::Caret),
            '~' => Some(Direction::Tilde),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Direction::Caret => '^',
            Direction::Tilde => '~',
        }
    }
}

/// The part of a reference that is evaluated against a plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefTarget {
    Change(String),
    Tag(String),
    ChangeAtTag {
        change: String,
        tag: String,
    },
    /// Lowercase 40-character hex change id.
    Sha1(String),
    Symbolic(Symbol),
    Relative {
        base: Box<RefTarget>,
        direction: Direction,
        count: u32,
    },
}

/// Parsed dependency or revision expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// Owning project when the reference points into another plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub target: RefTarget,
}

impl Reference {
    /// Local reference without a project qualifier.
    pub fn local(target: RefTarget) -> Self {
        Self {
            project: None,
            target,
        }
    }

    /// True when the reference belongs to another plan.
    pub fn is_external(&self) -> bool {
        self.project.is_some()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(project) = &self.project {
            write!(f, "{project}:")?;
        }
        write!(f, "{}", self.target)
    }
}

impl fmt::Display for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Change(change) => f.write_str(change),
            RefTarget::Tag(tag) => write!(f, "@{tag}"),
            RefTarget::ChangeAtTag { change, tag } => write!(f, "{change}@{tag}"),
            RefTarget::Sha1(hash) => f.write_str(hash),
            RefTarget::Symbolic(symbol) => f.write_str(symbol.as_str()),
            // Digits are always written so nested suffixes stay unambiguous.
            RefTarget::Relative {
                base,
                direction,
                count,
            } => write!(f, "{base}{}{count}", direction.symbol()),
        }
    }
}

/// Parse a dependency or revision expression.
///
/// Returns `None` for anything outside the grammar, including `!` conflict
/// markers, so callers can attach the failure to their own line context.
pub fn parse_reference(input: &str) -> Option<Reference> {
    let mut parts = input.split(':');
    let first = parts.next()?;
    match (parts.next(), parts.next()) {
        (None, _) => Some(Reference::local(parse_target(first)?)),
        (Some(rest), None) => {
            if !is_valid_change_name(first) {
                return None;
            }
            Some(Reference {
                project: Some(first.to_string()),
                target: parse_target(rest)?,
            })
        }
        _ => None,
    }
}

/// Returns true when `input` parses as a reference.
pub fn is_valid_dependency(input: &str) -> bool {
    parse_reference(input).is_some()
}

enum Suffix<'a> {
    Plain,
    Relative {
        base: &'a str,
        direction: Direction,
        count: u32,
    },
}

fn parse_target(input: &str) -> Option<RefTarget> {
    match split_relative(input)? {
        Suffix::Relative {
            base,
            direction,
            count,
        } => {
            let base = parse_target(base)?;
            Some(RefTarget::Relative {
                base: Box::new(base),
                direction,
                count,
            })
        }
        Suffix::Plain => parse_plain(input),
    }
}

/// Splits a trailing `^`, `^^`, `^N`, `~` or `~N`; `None` marks a malformed suffix.
fn split_relative(input: &str) -> Option<Suffix<'_>> {
    let head = input.trim_end_matches(|ch: char| ch.is_ascii_digit());
    let digits = &input[head.len()..];

    let Some(last) = head.chars().last() else {
        return Some(Suffix::Plain);
    };
    let Some(direction) = Direction::from_symbol(last) else {
        return Some(Suffix::Plain);
    };
    let before = &head[..head.len() - 1];

    if !digits.is_empty() {
        if before.ends_with(last) {
            return None;
        }
        let count: u32 = digits.parse().ok()?;
        if count == 0 {
            return None;
        }
        return Some(Suffix::Relative {
            base: before,
            direction,
            count,
        });
    }

    match direction {
        Direction::Caret => {
            let base = head.trim_end_matches('^');
            let count = u32::try_from(head.len() - base.len()).ok()?;
            Some(Suffix::Relative {
                base,
                direction,
                count,
            })
        }
        Direction::Tilde => Some(Suffix::Relative {
            base: before,
            direction,
            count: 1,
        }),
    }
}

fn parse_plain(input: &str) -> Option<RefTarget> {
    let (tagged, rest) = match input.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    if is_change_id(rest) {
        return Some(RefTarget::Sha1(rest.to_ascii_lowercase()));
    }
    if let Some(symbol) = Symbol::from_name(rest) {
        return Some(RefTarget::Symbolic(symbol));
    }
    if tagged {
        return is_valid_tag_name(rest).then(|| RefTarget::Tag(rest.to_string()));
    }
    if let Some((change, tag)) = rest.split_once('@') {
        return (is_valid_change_name(change) && is_valid_tag_name(tag)).then(|| {
            RefTarget::ChangeAtTag {
                change: change.to_string(),
                tag: tag.to_string(),
            }
        });
    }
    is_valid_change_name(rest).then(|| RefTarget::Change(rest.to_string()))
}

fn is_change_id(value: &str) -> bool {
    value.len() == CHANGE_ID_LEN && value.chars().all(|ch| ch.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str) -> RefTarget {
        RefTarget::Change(name.to_string())
    }

    fn relative(base: RefTarget, direction: Direction, count: u32) -> RefTarget {
        RefTarget::Relative {
            base: Box::new(base),
            direction,
            count,
        }
    }

    #[test]
    fn parses_plain_and_tagged_forms() {
        assert_eq!(
            parse_reference("users_table"),
            Some(Reference::local(change("users_table")))
        );
        assert_eq!(
            parse_reference("@v1.0"),
            Some(Reference::local(RefTarget::Tag("v1.0".to_string())))
        );
        assert_eq!(
            parse_reference("users_table@v1.0"),
            Some(Reference::local(RefTarget::ChangeAtTag {
                change: "users_table".to_string(),
                tag: "v1.0".to_string(),
            }))
        );
    }

    #[test]
    fn symbolic_names_drop_the_at_sign() {
        assert_eq!(
            parse_reference("@HEAD"),
            Some(Reference::local(RefTarget::Symbolic(Symbol::Head)))
        );
        assert_eq!(parse_reference("@ROOT"), parse_reference("ROOT"));
    }

    #[test]
    fn parses_hashes_case_insensitively() {
        let upper = "ABCDEF0123456789ABCDEF0123456789ABCDEF01";
        let parsed = parse_reference(upper).expect("hash should parse");
        assert_eq!(parsed.target, RefTarget::Sha1(upper.to_ascii_lowercase()));
    }

    #[test]
    fn caret_runs_and_digits_are_equivalent() {
        let expected = relative(RefTarget::Symbolic(Symbol::Head), Direction::Caret, 2);
        assert_eq!(parse_reference("@HEAD^^").map(|r| r.target), Some(expected.clone()));
        assert_eq!(parse_reference("HEAD^2").map(|r| r.target), Some(expected));
    }

    #[test]
    fn bare_suffix_counts_one() {
        assert_eq!(
            parse_reference("foo~").map(|r| r.target),
            Some(relative(change("foo"), Direction::Tilde, 1))
        );
        assert_eq!(
            parse_reference("foo^").map(|r| r.target),
            Some(relative(change("foo"), Direction::Caret, 1))
        );
    }

    #[test]
    fn project_prefix_wraps_relative_reference() {
        let parsed = parse_reference("project:foo~3").expect("should parse");
        assert_eq!(parsed.project.as_deref(), Some("project"));
        assert_eq!(parsed.target, relative(change("foo"), Direction::Tilde, 3));
    }

    #[test]
    fn tag_context_is_kept_for_relative_base() {
        assert_eq!(
            parse_reference("@v2~").map(|r| r.target),
            Some(relative(RefTarget::Tag("v2".to_string()), Direction::Tilde, 1))
        );
    }

    #[test]
    fn rejects_malformed_references() {
        for input in [
            "foo:bar:baz",
            "",
            ":foo",
            "@",
            "foo^^3",
            "foo~~2",
            "foo^0",
            "@@tag",
            "a@b@c",
            "change@release/1",
            "has space",
            "has#hash",
            "!broken_change",
            "^",
            "proj:",
        ] {
            assert_eq!(parse_reference(input), None, "{input:?} should not parse");
        }
    }

    #[test]
    fn display_round_trips() {
        for input in [
            "users",
            "@v1.0",
            "users@v1.0",
            "HEAD",
            "ROOT~2",
            "ext:users",
            "ext:@v1^",
            "foo^^",
            "foo^2~3",
            "foo~~",
            "@HEAD^^",
            "0123456789abcdef0123456789abcdef01234567",
        ] {
            let parsed = parse_reference(input).expect("should parse");
            let rendered = parsed.to_string();
            assert_eq!(parse_reference(&rendered), Some(parsed), "{input} -> {rendered}");
        }
    }

    #[test]
    fn validity_helper_matches_parser() {
        assert!(is_valid_dependency("a@b"));
        assert!(!is_valid_dependency("a:b:c"));
    }
}
