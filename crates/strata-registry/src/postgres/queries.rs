use chrono::{DateTime, Utc};
use sqlx::PgPool;

use strata_core::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
pub struct RawChange {
    pub change_name: String,
    pub deployed_at: DateTime<Utc>,
    pub script_hash: Option<String>,
}

pub async fn registry_exists(pool: &PgPool, schema: &str) -> Result<bool> {
    let table = format!("{}.changes", quote_ident(schema));
    sqlx::query_scalar::<_, bool>("select to_regclass($1) is not null")
        .bind(table)
        .fetch_one(pool)
        .await
        .map_err(|err| Error::Db(err.to_string()))
}

pub async fn list_changes(pool: &PgPool, schema: &str, project: &str) -> Result<Vec<RawChange>> {
    let sql = format!(
        r#"
        select change_name, deployed_at, script_hash
        from {}.changes
        where project = $1
        order by deployed_at, change_name
        "#,
        quote_ident(schema)
    );
    sqlx::query_as::<_, RawChange>(&sql)
        .bind(project)
        .fetch_all(pool)
        .await
        .map_err(|err| Error::Db(err.to_string()))
}

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("strata_migrate"), "\"strata_migrate\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
