use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use strata_core::RegistryState;

use crate::errors::{DeployError, Divergence, Result};
use crate::graph::DependencyGraph;

/// Plan versus deployed state at a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryDiff {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Changes in the slice not yet deployed, in deployment order.
    pub pending: Vec<String>,
    /// Changes in the slice already deployed, in plan order.
    pub deployed: Vec<String>,
    /// Deployed changes whose deploy script changed since deployment.
    pub modified: Vec<String>,
}

impl RegistryDiff {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

impl DependencyGraph {
    /// Compare deployed state with the plan, up to `target` or the whole plan.
    pub fn diff(&self, registry: &RegistryState, target: Option<&str>) -> Result<RegistryDiff> {
        self.diff_with_scripts(registry, target, &BTreeMap::new())
    }

    /// Like [`DependencyGraph::diff`], also flagging deployed changes whose
    /// current deploy script hash (by change name) differs from the recorded one.
    pub fn diff_with_scripts(
        &self,
        registry: &RegistryState,
        target: Option<&str>,
        script_hashes: &BTreeMap<String, String>,
    ) -> Result<RegistryDiff> {
        self.check_project(registry)?;
        let slice = match target {
            Some(target) => self.deployment_plan_to(target)?,
            None => self.deployment_plan()?,
        };
        let deployed_names = registry.deployed_names();
        let in_slice: BTreeSet<&str> = slice.changes.iter().map(String::as_str).collect();

        let mut divergence = Divergence::default();
        for change in &registry.changes {
            let name = change.change_name.as_str();
            if self.node(name).is_none() {
                divergence.unknown.push(name.to_string());
            } else if !in_slice.contains(name) {
                divergence.beyond_target.push(name.to_string());
            }
        }
        for node in &self.nodes {
            if !deployed_names.contains(node.name.as_str()) {
                continue;
            }
            for dependency in &node.dependencies {
                if !deployed_names.contains(dependency.as_str()) {
                    divergence
                        .missing_dependencies
                        .push((node.name.clone(), dependency.clone()));
                }
            }
        }
        if !divergence.is_empty() {
            tracing::warn!(event = "registry_divergence", detail = %divergence);
            return Err(DeployError::Divergence(divergence));
        }

        let (deployed, pending): (Vec<String>, Vec<String>) = slice
            .changes
            .into_iter()
            .partition(|name| deployed_names.contains(name.as_str()));

        let modified = deployed
            .iter()
            .filter(|name| {
                let recorded = registry.get(name).map(|change| change.script_hash.as_str());
                match (script_hashes.get(name.as_str()), recorded) {
                    (Some(current), Some(recorded)) => current != recorded,
                    _ => false,
                }
            })
            .cloned()
            .collect();

        tracing::debug!(
            event = "registry_diffed",
            pending = pending.len(),
            deployed = deployed.len()
        );
        Ok(RegistryDiff {
            target: target.map(str::to_string),
            pending,
            deployed,
            modified,
        })
    }
}
