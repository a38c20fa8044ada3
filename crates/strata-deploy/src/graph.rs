use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use strata_core::{change_id, parse_reference, Plan};
use strata_plan::ParsedPlan;

use crate::errors::{DeployError, GraphError, Result};
use crate::resolve::Resolution;

/// One change in the dependency graph.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeNode {
    pub name: String,
    /// Index among the plan's changes.
    pub position: usize,
    pub line: usize,
    pub change_id: String,
    /// Dependency expressions exactly as written in the plan.
    pub requires: Vec<String>,
    /// Resolved local dependencies, in declaration order.
    pub dependencies: Vec<String>,
    /// Project-qualified dependencies recorded as written.
    pub externals: Vec<String>,
}

/// Summary of graph structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub externals: usize,
}

/// Validated dependency graph of a plan.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    pub(crate) project: String,
    pub(crate) nodes: Vec<ChangeNode>,
    #[serde(skip)]
    pub(crate) index: HashMap<String, usize>,
    /// Tag name to the position of the change it is attached to.
    pub(crate) tags: BTreeMap<String, usize>,
    #[serde(skip)]
    pub(crate) ids: HashMap<String, usize>,
    #[serde(skip)]
    pub(crate) edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build and validate the graph for a plan.
    ///
    /// All problems are accumulated and returned together as
    /// [`DeployError::Graph`].
    pub fn build(plan: &Plan) -> Result<Self> {
        let mut errors = Vec::new();
        let mut graph = Self::collect(plan, &mut errors);

        let count = graph.nodes.len();
        graph.edges = vec![Vec::new(); count];
        let mut resolved: Vec<(Vec<String>, Vec<String>)> = Vec::with_capacity(count);
        // Plan order: caret walks read the edges of earlier changes.
        for position in 0..count {
            let (targets, dependencies, externals) =
                graph.resolve_dependencies(position, &mut errors);
            graph.edges[position] = targets;
            resolved.push((dependencies, externals));
        }

        for (node, (dependencies, externals)) in graph.nodes.iter_mut().zip(resolved) {
            node.dependencies = dependencies;
            node.externals = externals;
        }

        for path in find_cycles(&graph.nodes, &graph.edges) {
            errors.push(GraphError::Cycle { path });
        }

        if !errors.is_empty() {
            tracing::debug!(event = "graph_rejected", errors = errors.len());
            return Err(DeployError::Graph(errors));
        }

        tracing::debug!(
            event = "graph_built",
            project = %graph.project,
            nodes = graph.nodes.len(),
            edges = graph.summary().edges
        );
        Ok(graph)
    }

    /// Edge targets, local names and external references of one change.
    fn resolve_dependencies(
        &self,
        position: usize,
        errors: &mut Vec<GraphError>,
    ) -> (Vec<usize>, Vec<String>, Vec<String>) {
        let node = &self.nodes[position];
        let mut targets = Vec::new();
        let mut dependencies = Vec::new();
        let mut externals = Vec::new();
        for raw in &node.requires {
            let Some(reference) = parse_reference(raw) else {
                errors.push(GraphError::ReferenceSyntax {
                    change: node.name.clone(),
                    line: node.line,
                    dependency: raw.clone(),
                });
                continue;
            };
            match self.resolve_reference(&reference) {
                Some(Resolution::External) => externals.push(raw.clone()),
                Some(Resolution::Local(target)) => {
                    if target > position {
                        errors.push(GraphError::ForwardReference {
                            change: node.name.clone(),
                            line: node.line,
                            dependency: raw.clone(),
                            target: self.nodes[target].name.clone(),
                        });
                    }
                    if !targets.contains(&target) {
                        targets.push(target);
                        dependencies.push(self.nodes[target].name.clone());
                    }
                }
                None => errors.push(GraphError::UnresolvedReference {
                    change: node.name.clone(),
                    line: node.line,
                    dependency: raw.clone(),
                }),
            }
        }
        (targets, dependencies, externals)
    }

    /// Build from a parse result, refusing plans that already carry errors.
    pub fn from_parsed(parsed: &ParsedPlan) -> Result<Self> {
        if !parsed.is_valid() {
            return Err(DeployError::InvalidPlan(parsed.report.clone()));
        }
        Self::build(&parsed.plan)
    }

    /// Nodes, tag positions and change ids before dependency resolution.
    fn collect(plan: &Plan, errors: &mut Vec<GraphError>) -> Self {
        let project = plan.project().unwrap_or_default().to_string();
        let uri = plan.uri();
        let mut nodes: Vec<ChangeNode> = Vec::new();
        let mut index = HashMap::new();
        let mut ids = HashMap::new();

        for change in plan.changes() {
            if let Some(&first) = index.get(&change.name) {
                let first_node: &ChangeNode = &nodes[first];
                errors.push(GraphError::DuplicateChangeName {
                    name: change.name.clone(),
                    line: change.line,
                    first_line: first_node.line,
                });
                continue;
            }
            let position = nodes.len();
            let parent = nodes.last().map(|node| node.change_id.as_str());
            let id = change_id(&project, uri, parent, change);
            index.insert(change.name.clone(), position);
            ids.insert(id.clone(), position);
            nodes.push(ChangeNode {
                name: change.name.clone(),
                position,
                line: change.line,
                change_id: id,
                requires: change.dependencies.clone(),
                dependencies: Vec::new(),
                externals: Vec::new(),
            });
        }

        let mut tags = BTreeMap::new();
        for (tag, change) in plan.tag_attachments() {
            match change.and_then(|change| index.get(&change.name)) {
                Some(&position) => {
                    tags.entry(tag.name.clone()).or_insert(position);
                }
                None => errors.push(GraphError::OrphanTag {
                    tag: tag.name.clone(),
                    line: tag.line,
                }),
            }
        }

        Self {
            project,
            nodes,
            index,
            tags,
            ids,
            edges: Vec::new(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Nodes in plan order.
    pub fn nodes(&self) -> &[ChangeNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&ChangeNode> {
        self.index.get(name).map(|&position| &self.nodes[position])
    }

    /// Tag names mapped to the change they mark.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &ChangeNode)> {
        self.tags
            .iter()
            .map(|(tag, &position)| (tag.as_str(), &self.nodes[position]))
    }

    /// Projects referenced by project-qualified dependencies.
    pub fn external_projects(&self) -> BTreeSet<String> {
        self.nodes
            .iter()
            .flat_map(|node| node.externals.iter())
            .filter_map(|raw| parse_reference(raw).and_then(|reference| reference.project))
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.nodes.iter().map(|node| node.dependencies.len()).sum(),
            externals: self.nodes.iter().map(|node| node.externals.len()).sum(),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

/// Depth-first search over dependency edges, reporting each distinct cycle once.
///
/// Paths start and end on the same change, e.g. `a -> b -> a`.
fn find_cycles(nodes: &[ChangeNode], edges: &[Vec<usize>]) -> Vec<Vec<String>> {
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut seen: BTreeSet<Vec<usize>> = BTreeSet::new();
    let mut cycles = Vec::new();

    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Active;
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            if next >= edges[node].len() {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            }
            frame.1 += 1;

            let dependency = edges[node][next];
            match marks[dependency] {
                Mark::Unvisited => {
                    marks[dependency] = Mark::Active;
                    stack.push((dependency, 0));
                }
                Mark::Active => {
                    let start = stack
                        .iter()
                        .position(|(member, _)| *member == dependency)
                        .unwrap_or_default();
                    let members: Vec<usize> = stack[start..].iter().map(|(member, _)| *member).collect();
                    let mut key = members.clone();
                    key.sort_unstable();
                    if seen.insert(key) {
                        let mut path: Vec<String> =
                            members.iter().map(|&member| nodes[member].name.clone()).collect();
                        path.push(nodes[dependency].name.clone());
                        cycles.push(path);
                    }
                }
                Mark::Done => {}
            }
        }
    }

    cycles
}
