//! Plan serialization and extension packaging.

pub mod errors;
pub mod package;
pub mod replacer;
pub mod serialize;

pub use errors::{PackageError, Result};
pub use package::{
    control_file, external_projects, package, DirScriptSource, FileWrite, Package,
    PackageOptions, ScriptKind, ScriptSource,
};
pub use replacer::{make_replacer, snake_case, Replacer, ReplacerOptions, SchemaMapping};
pub use serialize::{serialize_plan, SerializedPlan};
