//! Core contracts and helpers for Strata.
//!
//! This crate defines the plan data model, the name and reference grammars,
//! and the registry contract shared by the parser, planner, packager and CLI.

pub mod error;
pub mod hash;
pub mod names;
pub mod plan;
pub mod reference;
pub mod registry;

pub use error::{Error, Result};
pub use hash::{change_id, script_hash};
pub use names::{is_valid_change_name, is_valid_tag_name};
pub use plan::{
    Change, Plan, PlanEntry, Pragma, Tag, PRAGMA_PROJECT, PRAGMA_SYNTAX_VERSION, PRAGMA_URI,
};
pub use reference::{is_valid_dependency, parse_reference, Direction, RefTarget, Reference, Symbol};
pub use registry::{ensure_unique_changes, DeployedChange, RegistryState};

/// Plan syntax version written by the serializer when a plan has none.
pub const SYNTAX_VERSION: &str = "1.0.0";
