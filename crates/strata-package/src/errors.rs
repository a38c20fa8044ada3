use std::path::PathBuf;

use thiserror::Error;

use crate::package::ScriptKind;

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("invalid package name '{0}'")]
    InvalidName(String),
    #[error("missing {kind} script for change '{change}' at {}", .path.display())]
    MissingScript {
        kind: ScriptKind,
        change: String,
        path: PathBuf,
    },
    #[error("change '{change}' maps to {}, which leaves the package root", .path.display())]
    UnsafePath { change: String, path: PathBuf },
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PackageError>;
