use thiserror::Error;

/// Core error type shared across Strata crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Registry backend failure.
    #[error("database error: {0}")]
    Db(String),
    /// A registry snapshot violates its contract.
    #[error("invalid registry: {0}")]
    InvalidRegistry(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by Strata crates.
pub type Result<T> = std::result::Result<T, Error>;
