use std::env;
use std::fs;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use strata_registry::{PostgresRegistry, RegistryReader, SnapshotRegistry};

const SNAPSHOT: &str = r#"{
  "project": "app",
  "changes": [
    {"change_name": "schema", "deployed_at": "2024-01-01T00:00:00Z", "script_hash": "aa"},
    {"change_name": "users", "deployed_at": "2024-01-02T00:00:00Z", "script_hash": "bb"}
  ]
}"#;

#[tokio::test]
async fn snapshot_reader_rereads_the_file_on_every_fetch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.json");
    fs::write(&path, SNAPSHOT)?;

    let reader = SnapshotRegistry::new(&path);
    assert_eq!(reader.backend(), "snapshot");
    let first = reader.fetch("app").await?;
    assert_eq!(first.changes.len(), 2);

    fs::write(&path, r#"{"project": "app", "changes": []}"#)?;
    let second = reader.fetch("app").await?;
    assert!(second.changes.is_empty());
    Ok(())
}

#[tokio::test]
async fn snapshot_reader_reports_missing_file() {
    let reader = SnapshotRegistry::new("/nonexistent/registry.json");
    assert!(reader.fetch("app").await.is_err());
}

#[tokio::test]
async fn postgres_reader_reads_changes_for_one_project() -> Result<()> {
    let Ok(url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping postgres registry test");
        return Ok(());
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&url)
        .await
        .context("connecting to Postgres")?;

    let schema = format!("strata_test_{}", std::process::id());
    let setup = [
        format!("drop schema if exists \"{schema}\" cascade"),
        format!("create schema \"{schema}\""),
        format!(
            "create table \"{schema}\".changes (project text not null, change_name text not null, \
             deployed_at timestamptz not null, script_hash text)"
        ),
        format!(
            "insert into \"{schema}\".changes values \
             ('app', 'users', '2024-01-02T00:00:00Z', 'bb'), \
             ('app', 'schema', '2024-01-01T00:00:00Z', 'aa'), \
             ('other', 'x', '2024-01-01T00:00:00Z', null)"
        ),
    ];
    for statement in &setup {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .with_context(|| format!("executing {statement}"))?;
    }

    let reader = PostgresRegistry::new(pool.clone(), schema.clone());
    let state = reader.fetch("app").await?;
    let names: Vec<&str> = state
        .changes
        .iter()
        .map(|change| change.change_name.as_str())
        .collect();
    assert_eq!(names, vec!["schema", "users"]);
    assert_eq!(state.changes[0].script_hash, "aa");

    let empty = PostgresRegistry::new(pool.clone(), format!("{schema}_absent"))
        .fetch("app")
        .await?;
    assert!(empty.changes.is_empty());

    sqlx::query(&format!("drop schema \"{schema}\" cascade"))
        .execute(&pool)
        .await?;
    Ok(())
}
