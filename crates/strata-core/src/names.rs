//! Syntax gates for change and tag names.
//!
//! A name must never be confusable with reference syntax, so the symbols used
//! by the reference grammar (`@`, `:`, relative suffixes) are rejected here.

const FORBIDDEN: &[char] = &['@', ':', '\\', '#'];
const EDGE_PUNCTUATION: &[char] = &['+', '-', '.', '!'];
const SUFFIX_MARKERS: &[char] = &['^', '~', '/', '=', '%'];

/// Returns true when `name` may be stored as a change name.
pub fn is_valid_change_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    if name
        .chars()
        .any(|ch| ch.is_whitespace() || FORBIDDEN.contains(&ch))
    {
        return false;
    }

    let Some(first) = name.chars().next() else {
        return false;
    };
    if first == '%' || EDGE_PUNCTUATION.contains(&first) {
        return false;
    }

    let Some(last) = name.chars().last() else {
        return false;
    };
    if EDGE_PUNCTUATION.contains(&last) {
        return false;
    }

    !has_reference_suffix(name)
}

/// Returns true when `name` may be stored as a tag name.
///
/// Tags follow the change rules and additionally cannot contain `/`.
pub fn is_valid_tag_name(name: &str) -> bool {
    !name.contains('/') && is_valid_change_name(name)
}

/// Detects suffixes such as `^`, `~3`, `/2`, `=` or `%10`.
fn has_reference_suffix(name: &str) -> bool {
    let head = name.trim_end_matches(|ch: char| ch.is_ascii_digit());
    head.chars()
        .last()
        .is_some_and(|ch| SUFFIX_MARKERS.contains(&ch))
}
