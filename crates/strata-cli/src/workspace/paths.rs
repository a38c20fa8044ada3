use std::path::{Path, PathBuf};

use super::StrataSettings;

/// Locations derived from the project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join("strata.toml")
    }

    /// Plan given on the command line, else the configured plan file.
    pub fn plan_path(&self, explicit: Option<&Path>, settings: &StrataSettings) -> PathBuf {
        match explicit {
            Some(path) => path.to_path_buf(),
            None => self.root.join(&settings.plan_file),
        }
    }

    /// Configured log file, relative paths resolved against the root.
    pub fn log_path(&self, settings: &StrataSettings) -> Option<PathBuf> {
        settings
            .logging
            .file
            .as_ref()
            .map(|file| self.root.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_plan_wins_over_settings() {
        let paths = ProjectPaths::new(PathBuf::from("/work"));
        let settings = StrataSettings::default();
        assert_eq!(
            paths.plan_path(None, &settings),
            PathBuf::from("/work/strata.plan")
        );
        assert_eq!(
            paths.plan_path(Some(Path::new("other.plan")), &settings),
            PathBuf::from("other.plan")
        );
        assert_eq!(paths.log_path(&settings), None);
    }
}
