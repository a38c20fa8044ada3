use strata_core::{ensure_unique_changes, DeployedChange, Result};

use super::queries::RawChange;

/// Rows become deployed changes; a change recorded twice is a broken registry.
pub fn map_changes(raw: Vec<RawChange>) -> Result<Vec<DeployedChange>> {
    let changes: Vec<DeployedChange> = raw
        .into_iter()
        .map(|row| DeployedChange {
            change_name: row.change_name,
            deployed_at: row.deployed_at,
            script_hash: row.script_hash.unwrap_or_default(),
        })
        .collect();
    ensure_unique_changes(&changes)?;
    Ok(changes)
}
