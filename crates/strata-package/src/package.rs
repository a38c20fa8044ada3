use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use strata_core::{parse_reference, Plan, PRAGMA_PROJECT, PRAGMA_SYNTAX_VERSION, PRAGMA_URI, SYNTAX_VERSION};

use crate::errors::{PackageError, Result};
use crate::replacer::{make_replacer, ReplacerOptions, SchemaMapping};
use crate::serialize::serialize_plan;

/// Script kinds stored per change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptKind {
    Deploy,
    Revert,
    Verify,
}

impl ScriptKind {
    pub const ALL: [ScriptKind; 3] = [ScriptKind::Deploy, ScriptKind::Revert, ScriptKind::Verify];

    /// Directory holding scripts of this kind.
    pub fn dir(self) -> &'static str {
        match self {
            ScriptKind::Deploy => "deploy",
            ScriptKind::Revert => "revert",
            ScriptKind::Verify => "verify",
        }
    }

    /// Relative path of the script for `change`; slashes in names become directories.
    pub fn script_path(self, change: &str) -> PathBuf {
        Path::new(self.dir()).join(format!("{change}.sql"))
    }

    /// [`Self::script_path`], refusing names that climb out of the script directory.
    pub fn contained_path(self, change: &str) -> Result<PathBuf> {
        let path = self.script_path(change);
        ensure_contained(change, &path)?;
        Ok(path)
    }
}

/// Only plain components: no `..`, root, drive prefix or `.`.
fn ensure_contained(change: &str, path: &Path) -> Result<()> {
    if path.components().all(|part| matches!(part, Component::Normal(_))) {
        Ok(())
    } else {
        Err(PackageError::UnsafePath {
            change: change.to_string(),
            path: path.to_path_buf(),
        })
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// Supplies SQL bodies for changes.
pub trait ScriptSource {
    fn read(&self, kind: ScriptKind, change: &str) -> Result<String>;
}

/// Reads scripts from `<root>/{deploy,revert,verify}/<change>.sql`.
#[derive(Debug, Clone)]
pub struct DirScriptSource {
    root: PathBuf,
}

impl DirScriptSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ScriptSource for DirScriptSource {
    fn read(&self, kind: ScriptKind, change: &str) -> Result<String> {
        let path = self.root.join(kind.contained_path(change)?);
        match std::fs::read_to_string(&path) {
            Ok(body) => Ok(body),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(PackageError::MissingScript {
                    kind,
                    change: change.to_string(),
                    path,
                })
            }
            Err(source) => Err(PackageError::Io { path, source }),
        }
    }
}

/// Packaging parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
    /// Extension and project name stamped into the package.
    pub name: String,
    pub version: String,
    pub schemas: Vec<SchemaMapping>,
    /// File name of the rewritten plan inside the package.
    pub plan_file: String,
}

impl PackageOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "0.0.1".to_string(),
            schemas: Vec::new(),
            plan_file: "strata.plan".to_string(),
        }
    }
}

/// One file to write, relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileWrite {
    pub path: PathBuf,
    pub content: String,
}

/// Files making up a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub files: Vec<FileWrite>,
    /// Projects the package depends on.
    pub externals: Vec<String>,
    /// Warnings raised while re-serializing the plan.
    pub warnings: Vec<String>,
}

impl Package {
    pub fn file(&self, path: impl AsRef<Path>) -> Option<&FileWrite> {
        self.files.iter().find(|file| file.path == path.as_ref())
    }
}

/// Stamp a template plan and its scripts with a package identity.
///
/// Nothing is written; the caller decides how to persist [`FileWrite`]s.
pub fn package(plan: &Plan, source: &dyn ScriptSource, options: &PackageOptions) -> Result<Package> {
    if !strata_core::is_valid_change_name(&options.name) {
        return Err(PackageError::InvalidName(options.name.clone()));
    }
    let control_path = PathBuf::from(format!("{}.control", options.name));
    ensure_contained(&options.name, &control_path)?;

    let replacer = make_replacer(&ReplacerOptions {
        schemas: options.schemas.clone(),
        name: options.name.clone(),
    });

    let mut files = Vec::new();
    let mut seen = HashSet::new();
    for change in plan.changes() {
        if !seen.insert(change.name.as_str()) {
            continue;
        }
        for kind in ScriptKind::ALL {
            let path = kind.contained_path(&change.name)?;
            let body = source.read(kind, &change.name)?;
            files.push(FileWrite {
                path,
                content: replacer.apply(&body),
            });
        }
    }

    let mut stamped = plan.clone();
    if stamped.syntax_version().is_none() {
        stamped.set_pragma(PRAGMA_SYNTAX_VERSION, SYNTAX_VERSION);
    }
    stamped.set_pragma(PRAGMA_PROJECT, options.name.as_str());
    stamped.set_pragma(PRAGMA_URI, options.name.as_str());
    let serialized = serialize_plan(&stamped);
    files.push(FileWrite {
        path: PathBuf::from(&options.plan_file),
        content: serialized.text,
    });

    let externals = external_projects(plan);
    files.push(FileWrite {
        path: control_path,
        content: control_file(options, &externals),
    });

    tracing::info!(
        event = "package_built",
        name = %options.name,
        files = files.len(),
        externals = externals.len()
    );

    Ok(Package {
        files,
        externals,
        warnings: serialized.warnings,
    })
}

/// Projects named by project-qualified dependencies, sorted.
pub fn external_projects(plan: &Plan) -> Vec<String> {
    plan.changes()
        .flat_map(|change| change.dependencies.iter())
        .filter_map(|raw| parse_reference(raw).and_then(|reference| reference.project))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Postgres extension control file.
pub fn control_file(options: &PackageOptions, externals: &[String]) -> String {
    let mut out = format!(
        "# {name} extension\n\
         comment = '{name} extension'\n\
         default_version = '{version}'\n\
         module_pathname = '$libdir/{name}'\n",
        name = options.name,
        version = options.version
    );
    if !externals.is_empty() {
        out.push_str(&format!("requires = '{}'\n", externals.join(",")));
    }
    out.push_str("relocatable = false\nsuperuser = false\n");
    out
}
