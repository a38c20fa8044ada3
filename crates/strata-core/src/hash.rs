use std::fmt::Write as _;

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::plan::Change;

/// Sqitch-compatible id of a change, so `Sha1` references match registry ids.
///
/// SHA-1 over `change <len>\0<info>`, where `info` lists the project, uri,
/// name, parent id, planner, date, requirements and note. `parent` is the id
/// of the preceding change in the plan.
pub fn change_id(project: &str, uri: Option<&str>, parent: Option<&str>, change: &Change) -> String {
    let mut info = format!("project {project}\n");
    if let Some(uri) = uri {
        let _ = writeln!(info, "uri {uri}");
    }
    let _ = writeln!(info, "change {}", change.name);
    if let Some(parent) = parent {
        let _ = writeln!(info, "parent {parent}");
    }
    let _ = write!(
        info,
        "planner {} <{}>\ndate {}",
        change.planner_name,
        change.planner_email,
        change.timestamp_string()
    );
    if !change.dependencies.is_empty() {
        info.push_str("\nrequires");
        for dependency in &change.dependencies {
            let _ = write!(info, "\n  + {dependency}");
        }
    }
    if !change.note.is_empty() {
        let _ = write!(info, "\n\n{}", change.note);
    }

    let mut hasher = Sha1::new();
    hasher.update(format!("change {}\0", info.len()).as_bytes());
    hasher.update(info.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hex SHA-256 of a script body, as recorded by the registry.
pub fn script_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
