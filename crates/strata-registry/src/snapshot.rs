use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;

use strata_core::{ensure_unique_changes, Error, RegistryState, Result};

use crate::reader::RegistryReader;

/// JSON Schema of a registry snapshot document.
pub fn registry_json_schema() -> Result<Value> {
    let schema = schemars::schema_for!(RegistryState);
    serde_json::to_value(&schema).map_err(|err| Error::Other(err.to_string()))
}

/// Validate and decode a snapshot document.
pub fn parse_snapshot(text: &str) -> Result<RegistryState> {
    let document: Value = serde_json::from_str(text)
        .map_err(|err| Error::InvalidRegistry(format!("snapshot is not JSON: {err}")))?;

    let schema = registry_json_schema()?;
    let compiled =
        JSONSchema::compile(&schema).map_err(|err| Error::Other(err.to_string()))?;
    if let Err(errors) = compiled.validate(&document) {
        let details: Vec<String> = errors
            .map(|error| format!("{}: {error}", pointer(&error.instance_path.to_string())))
            .collect();
        return Err(Error::InvalidRegistry(details.join("; ")));
    }

    let state: RegistryState =
        serde_json::from_value(document).map_err(|err| Error::InvalidRegistry(err.to_string()))?;
    ensure_unique_changes(&state.changes)?;
    Ok(state)
}

fn pointer(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Reads a JSON snapshot file on every fetch.
#[derive(Debug, Clone)]
pub struct SnapshotRegistry {
    path: PathBuf,
}

impl SnapshotRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistryReader for SnapshotRegistry {
    fn backend(&self) -> &'static str {
        "snapshot"
    }

    async fn fetch(&self, project: &str) -> Result<RegistryState> {
        let text = std::fs::read_to_string(&self.path).map_err(|err| {
            Error::Other(format!("failed to read {}: {err}", self.path.display()))
        })?;
        let state = parse_snapshot(&text)?;
        tracing::debug!(
            event = "registry_fetched",
            backend = "snapshot",
            project = project,
            snapshot_project = %state.project,
            changes = state.changes.len()
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_snapshot() {
        let state = parse_snapshot(
            r#"{
                "project": "app",
                "changes": [
                    {"change_name": "a", "deployed_at": "2024-01-01T00:00:00Z", "script_hash": "abc"}
                ]
            }"#,
        )
        .expect("snapshot");
        assert_eq!(state.project, "app");
        assert!(state.is_deployed("a"));
    }

    #[test]
    fn rejects_documents_violating_the_schema() {
        let err = parse_snapshot(r#"{"project": "app", "changes": [{"change_name": 3}]}"#)
            .expect_err("invalid");
        match err {
            Error::InvalidRegistry(message) => assert!(message.contains("/changes/0"), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_changes_recorded_twice() {
        let err = parse_snapshot(
            r#"{
                "project": "app",
                "changes": [
                    {"change_name": "a", "deployed_at": "2024-01-01T00:00:00Z", "script_hash": ""},
                    {"change_name": "a", "deployed_at": "2024-01-02T00:00:00Z", "script_hash": ""}
                ]
            }"#,
        )
        .expect_err("duplicate");
        match err {
            Error::InvalidRegistry(message) => assert!(message.contains("more than once"), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_snapshot("not json"),
            Err(Error::InvalidRegistry(_))
        ));
    }
}
