use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strata_registry::DEFAULT_REGISTRY_SCHEMA;

use super::atomic::write_bytes_atomic;
use super::{ProjectPaths, WorkspaceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Schema holding the `changes` table.
    pub schema: String,
    /// Environment variable consulted when no registry flag is given.
    pub database_url_env: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            schema: DEFAULT_REGISTRY_SCHEMA.to_string(),
            database_url_env: "DATABASE_URL".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    pub default_version: String,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            default_version: "0.0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file: None,
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataSettings {
    pub plan_file: PathBuf,
    pub registry: RegistrySettings,
    pub package: PackageSettings,
    pub logging: LogSettings,
}

impl Default for StrataSettings {
    fn default() -> Self {
        Self {
            plan_file: PathBuf::from("strata.plan"),
            registry: RegistrySettings::default(),
            package: PackageSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

/// Settings from `strata.toml`, or defaults when the file is absent.
pub fn load_settings(paths: &ProjectPaths) -> WorkspaceResult<StrataSettings> {
    let path = paths.settings_path();
    if !path.exists() {
        return Ok(StrataSettings::default());
    }
    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

pub fn load_or_create_settings(paths: &ProjectPaths) -> WorkspaceResult<StrataSettings> {
    if paths.settings_path().exists() {
        return load_settings(paths);
    }

    let settings = StrataSettings::default();
    save_settings(paths, &settings)?;
    Ok(settings)
}

pub fn save_settings(paths: &ProjectPaths, settings: &StrataSettings) -> WorkspaceResult<()> {
    let path = paths.settings_path();
    let encoded = toml::to_string_pretty(settings)?;
    write_bytes_atomic(&path, encoded.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_defaults_then_reads_them_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ProjectPaths::new(dir.path().to_path_buf());

        let created = load_or_create_settings(&paths).expect("create");
        assert!(paths.settings_path().exists());
        assert_eq!(load_settings(&paths).expect("load"), created);
    }

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ProjectPaths::new(dir.path().to_path_buf());
        std::fs::write(
            paths.settings_path(),
            "plan_file = \"db/app.plan\"\n\n[logging]\nformat = \"json\"\nfile = \"logs/strata.log\"\n",
        )
        .expect("write");

        let settings = load_settings(&paths).expect("load");
        assert_eq!(settings.plan_file, PathBuf::from("db/app.plan"));
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.registry, RegistrySettings::default());
        assert_eq!(
            paths.log_path(&settings),
            Some(dir.path().join("logs/strata.log"))
        );
    }

    #[test]
    fn missing_file_yields_defaults_without_creating_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = ProjectPaths::new(dir.path().to_path_buf());
        assert_eq!(load_settings(&paths).expect("load"), StrataSettings::default());
        assert!(!paths.settings_path().exists());
    }
}
