use std::collections::BTreeSet;

use serde::Serialize;
use strata_core::{Plan, RegistryState};

use crate::errors::{DeployError, Divergence, Result};
use crate::graph::DependencyGraph;

/// Ordered changes to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    pub project: String,
    /// Revision the plan was cut at, when partial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub changes: Vec<String>,
}

/// Deployed changes to revert, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevertPlan {
    pub project: String,
    pub target: String,
    pub changes: Vec<String>,
}

impl DependencyGraph {
    /// Every change in dependency order.
    pub fn deployment_plan(&self) -> Result<DeploymentPlan> {
        let changes = self.ordered_prefix(self.nodes.len())?;
        Ok(DeploymentPlan {
            project: self.project.clone(),
            target: None,
            changes,
        })
    }

    /// Changes up to and including `target`, in dependency order.
    pub fn deployment_plan_to(&self, target: &str) -> Result<DeploymentPlan> {
        let last = self.resolve(target)?.position;
        let changes = self.ordered_prefix(last + 1)?;
        tracing::debug!(
            event = "deployment_sliced",
            target = target,
            changes = changes.len(),
            total = self.nodes.len()
        );
        Ok(DeploymentPlan {
            project: self.project.clone(),
            target: Some(target.to_string()),
            changes,
        })
    }

    /// Deployed changes after `target`, newest first.
    ///
    /// Refuses registries for another project and registries naming changes
    /// the plan does not contain.
    pub fn revert_plan(&self, registry: &RegistryState, target: &str) -> Result<RevertPlan> {
        self.check_project(registry)?;
        let last = self.resolve(target)?.position;

        let unknown: Vec<String> = registry
            .changes
            .iter()
            .filter(|change| !self.index.contains_key(&change.change_name))
            .map(|change| change.change_name.clone())
            .collect();
        if !unknown.is_empty() {
            return Err(DeployError::Divergence(Divergence {
                unknown,
                ..Divergence::default()
            }));
        }

        let changes: Vec<String> = self.nodes[last + 1..]
            .iter()
            .rev()
            .filter(|node| registry.is_deployed(&node.name))
            .map(|node| node.name.clone())
            .collect();
        tracing::debug!(event = "revert_planned", target = target, changes = changes.len());

        Ok(RevertPlan {
            project: self.project.clone(),
            target: target.to_string(),
            changes,
        })
    }

    pub(crate) fn check_project(&self, registry: &RegistryState) -> Result<()> {
        if registry.project != self.project {
            return Err(DeployError::ProjectMismatch {
                plan: self.project.clone(),
                registry: registry.project.clone(),
            });
        }
        Ok(())
    }

    /// Topological order of the first `len` changes, ties broken by plan position.
    ///
    /// The result must equal plan order; anything else means the plan
    /// declares a change before one of its dependencies.
    fn ordered_prefix(&self, len: usize) -> Result<Vec<String>> {
        let mut indegree = vec![0usize; len];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); len];

        for position in 0..len {
            for &dependency in &self.edges[position] {
                if dependency >= len {
                    return Err(DeployError::IncompleteSlice {
                        change: self.nodes[position].name.clone(),
                        dependency: self.nodes[dependency].name.clone(),
                    });
                }
                indegree[position] += 1;
                dependents[dependency].push(position);
            }
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter_map(|(position, count)| (*count == 0).then_some(position))
            .collect();
        let mut order = Vec::with_capacity(len);

        while let Some(position) = ready.pop_first() {
            order.push(position);
            for &dependent in &dependents[position] {
                let count = &mut indegree[dependent];
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.insert(dependent);
                }
            }
        }

        for (expected, &position) in order.iter().enumerate() {
            if expected != position {
                return Err(DeployError::Reordered {
                    change: self.nodes[position].name.clone(),
                });
            }
        }
        if order.len() != len {
            let stuck = (0..len)
                .find(|position| !order.contains(position))
                .map(|position| self.nodes[position].name.clone())
                .unwrap_or_default();
            return Err(DeployError::Reordered { change: stuck });
        }

        Ok(order
            .into_iter()
            .map(|position| self.nodes[position].name.clone())
            .collect())
    }
}

/// Build the graph for `plan` and order it, optionally up to `target`.
pub fn plan_deployment(plan: &Plan, target: Option<&str>) -> Result<DeploymentPlan> {
    let graph = DependencyGraph::build(plan)?;
    match target {
        Some(target) => graph.deployment_plan_to(target),
        None => graph.deployment_plan(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use strata_core::DeployedChange;
    use strata_plan::parse_plan;

    use super::*;

    const PLAN: &str = "%syntax-version=1.0.0\n%project=app\n%uri=app\n\n\
        a 2024-01-01T00:00:00Z Ada <ada@example.com>\n\
        b [a] 2024-01-02T00:00:00Z Ada <ada@example.com>\n\
        @v1 2024-01-02T12:00:00Z Ada <ada@example.com>\n\
        c [b] 2024-01-03T00:00:00Z Ada <ada@example.com>\n\
        d 2024-01-04T00:00:00Z Ada <ada@example.com>\n";

    fn graph() -> DependencyGraph {
        DependencyGraph::build(&parse_plan(PLAN).plan).expect("graph")
    }

    fn registry(names: &[&str]) -> RegistryState {
        let changes = names
            .iter()
            .map(|name| DeployedChange {
                change_name: name.to_string(),
                deployed_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
                script_hash: String::new(),
            })
            .collect();
        RegistryState::new("app", changes)
    }

    #[test]
    fn full_plan_follows_plan_order() {
        let plan = graph().deployment_plan().expect("order");
        assert_eq!(plan.changes, vec!["a", "b", "c", "d"]);
        assert_eq!(plan.target, None);
    }

    #[test]
    fn partial_plan_stops_at_target() {
        let graph = graph();
        assert_eq!(graph.deployment_plan_to("b").expect("slice").changes, vec!["a", "b"]);
        assert_eq!(graph.deployment_plan_to("@v1").expect("slice").changes, vec!["a", "b"]);
        assert_eq!(
            graph.deployment_plan_to("HEAD~1").expect("slice").changes,
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn ordering_is_idempotent() {
        let graph = graph();
        let first = graph.deployment_plan().expect("order");
        let second = graph.deployment_plan().expect("order");
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_target_is_rejected() {
        assert!(matches!(
            graph().deployment_plan_to("zzz"),
            Err(DeployError::UnknownTarget(_))
        ));
    }

    #[test]
    fn revert_lists_deployed_suffix_newest_first() {
        let plan = graph()
            .revert_plan(&registry(&["a", "b", "c", "d"]), "@v1")
            .expect("revert");
        assert_eq!(plan.changes, vec!["d", "c"]);

        let plan = graph()
            .revert_plan(&registry(&["a", "b", "c"]), "a")
            .expect("revert");
        assert_eq!(plan.changes, vec!["c", "b"]);
    }

    #[test]
    fn revert_refuses_foreign_or_unknown_state() {
        let graph = graph();
        let mut other = registry(&["a"]);
        other.project = "other".to_string();
        assert!(matches!(
            graph.revert_plan(&other, "a"),
            Err(DeployError::ProjectMismatch { .. })
        ));
        assert!(matches!(
            graph.revert_plan(&registry(&["a", "ghost"]), "a"),
            Err(DeployError::Divergence(divergence)) if divergence.unknown == vec!["ghost"]
        ));
    }

    #[test]
    fn plan_deployment_surfaces_graph_errors() {
        let plan = parse_plan(
            "%project=app\n\
             a [b] 2024-01-01T00:00:00Z Ada <ada@example.com>\n\
             b [a] 2024-01-02T00:00:00Z Ada <ada@example.com>\n",
        )
        .plan;
        let err = plan_deployment(&plan, None).expect_err("cycle");
        assert!(!err.graph_errors().is_empty());
    }
}
