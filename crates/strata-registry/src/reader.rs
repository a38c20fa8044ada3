use async_trait::async_trait;

use strata_core::{RegistryState, Result};

/// Source of deployed-change records for a project.
///
/// Each call returns a fresh snapshot; implementations do not cache.
#[async_trait]
pub trait RegistryReader {
    /// Returns the backend identifier (e.g. `postgres`).
    fn backend(&self) -> &'static str;

    /// Fetch the deployed changes recorded for `project`, oldest first.
    async fn fetch(&self, project: &str) -> Result<RegistryState>;
}
