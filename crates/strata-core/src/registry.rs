use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Snapshot of changes already applied to a target database.
///
/// Produced by a registry reader and consumed read-only by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryState {
    /// Project the snapshot was fetched for.
    pub project: String,
    /// Deployed changes, oldest first.
    pub changes: Vec<DeployedChange>,
}

/// One deployed change as recorded by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeployedChange {
    pub change_name: String,
    pub deployed_at: DateTime<Utc>,
    /// Hash of the deploy script at deployment time.
    pub script_hash: String,
}

impl RegistryState {
    pub fn new(project: impl Into<String>, changes: Vec<DeployedChange>) -> Self {
        Self {
            project: project.into(),
            changes,
        }
    }

    /// Names of deployed changes.
    pub fn deployed_names(&self) -> BTreeSet<&str> {
        self.changes
            .iter()
            .map(|change| change.change_name.as_str())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&DeployedChange> {
        self.changes.iter().find(|change| change.change_name == name)
    }

    pub fn is_deployed(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// A change recorded more than once makes the registry unusable.
pub fn ensure_unique_changes(changes: &[DeployedChange]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for change in changes {
        if !seen.insert(change.change_name.as_str()) {
            return Err(Error::InvalidRegistry(format!(
                "change '{}' is recorded more than once",
                change.change_name
            )));
        }
    }
    Ok(())
}
