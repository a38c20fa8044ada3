use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use strata_core::{Error, RegistryState, Result};

use crate::reader::RegistryReader;

mod mapper;
mod queries;

/// Schema holding the `changes` table when none is configured.
pub const DEFAULT_REGISTRY_SCHEMA: &str = "strata_migrate";

/// Reads `<schema>.changes` from a Postgres database.
#[derive(Debug, Clone)]
pub struct PostgresRegistry {
    pool: PgPool,
    schema: String,
}

impl PostgresRegistry {
    /// Create a reader using a pre-configured pool.
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    /// Connect with a small pool suited to one-off CLI reads.
    pub async fn connect(url: &str, schema: impl Into<String>) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|err| Error::Db(err.to_string()))?;
        Ok(Self::new(pool, schema))
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

#[async_trait::async_trait]
impl RegistryReader for PostgresRegistry {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn fetch(&self, project: &str) -> Result<RegistryState> {
        fetch_registry(&self.pool, &self.schema, project).await
    }
}

/// Read the registry for `project`; a database without the registry table
/// has nothing deployed.
pub async fn fetch_registry(pool: &PgPool, schema: &str, project: &str) -> Result<RegistryState> {
    if !queries::registry_exists(pool, schema).await? {
        tracing::debug!(event = "registry_missing", schema = schema, project = project);
        return Ok(RegistryState::new(project, Vec::new()));
    }

    let rows = queries::list_changes(pool, schema, project).await?;
    let changes = mapper::map_changes(rows)?;
    tracing::debug!(
        event = "registry_fetched",
        backend = "postgres",
        project = project,
        changes = changes.len()
    );
    Ok(RegistryState::new(project, changes))
}
