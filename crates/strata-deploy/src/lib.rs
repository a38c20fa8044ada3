//! Dependency graph, revision resolution and deployment planning.
//!
//! Everything here is pure: a [`DependencyGraph`] is built from a parsed
//! plan, then asked for deployment orders, registry diffs or revert plans.
//! Registry state is passed per call and never retained.

pub mod diff;
pub mod errors;
pub mod graph;
pub mod planner;
mod resolve;

pub use diff::RegistryDiff;
pub use errors::{DeployError, Divergence, GraphError, Result};
pub use graph::{ChangeNode, DependencyGraph, GraphSummary};
pub use planner::{plan_deployment, DeploymentPlan, RevertPlan};
