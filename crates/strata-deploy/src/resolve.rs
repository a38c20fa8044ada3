use strata_core::{parse_reference, Direction, RefTarget, Reference, Symbol};

use crate::errors::{DeployError, Result};
use crate::graph::{ChangeNode, DependencyGraph};

/// Outcome of resolving a reference against one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Local(usize),
    External,
}

impl DependencyGraph {
    /// Resolve a revision expression to a change of this plan.
    pub fn resolve(&self, revision: &str) -> Result<&ChangeNode> {
        let reference = parse_reference(revision)
            .ok_or_else(|| DeployError::UnknownTarget(revision.to_string()))?;
        match self.resolve_reference(&reference) {
            Some(Resolution::Local(position)) => Ok(&self.nodes[position]),
            Some(Resolution::External) => Err(DeployError::ExternalTarget(revision.to_string())),
            None => Err(DeployError::UnknownTarget(revision.to_string())),
        }
    }

    /// Project-qualified references are never resolved locally.
    pub(crate) fn resolve_reference(&self, reference: &Reference) -> Option<Resolution> {
        if reference.is_external() {
            return Some(Resolution::External);
        }
        self.resolve_target(&reference.target)
            .map(Resolution::Local)
    }

    fn resolve_target(&self, target: &RefTarget) -> Option<usize> {
        match target {
            RefTarget::Change(name) => self.index.get(name).copied(),
            RefTarget::Tag(tag) => self.tags.get(tag).copied(),
            RefTarget::ChangeAtTag { change, tag } => {
                let position = *self.index.get(change)?;
                let tagged = *self.tags.get(tag)?;
                (position <= tagged).then_some(position)
            }
            RefTarget::Sha1(id) => self.ids.get(id).copied(),
            RefTarget::Symbolic(Symbol::Head) => self.nodes.len().checked_sub(1),
            RefTarget::Symbolic(Symbol::Root) => (!self.nodes.is_empty()).then_some(0),
            RefTarget::Relative {
                base,
                direction,
                count,
            } => {
                let mut position = self.resolve_target(base)?;
                match direction {
                    Direction::Tilde => position.checked_sub(*count as usize),
                    Direction::Caret => {
                        for _ in 0..*count {
                            position = self.first_parent(position)?;
                        }
                        Some(position)
                    }
                }
            }
        }
    }

    /// First declared dependency of a change that lives in this plan.
    ///
    /// Reads resolved edges, so during a build only earlier changes have one.
    fn first_parent(&self, position: usize) -> Option<usize> {
        self.edges.get(position)?.first().copied()
    }
}
