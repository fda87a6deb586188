// ABOUTME: Optional worklock.toml configuration at the project root, with defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Name of the optional configuration file at the project root.
pub const CONFIG_FILE: &str = "worklock.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("invalid {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

/// Tool configuration. Every field has a default, so an absent file or a
/// partial one is fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store directory, relative to the project root unless absolute.
    pub store_dir: PathBuf,
    /// Prefix of generated session branches.
    pub branch_prefix: String,
    /// Merge target when a session record predates `original_branch`.
    pub base_branch: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".worklock"),
            branch_prefix: "session/".to_string(),
            base_branch: "main".to_string(),
        }
    }
}

impl Config {
    /// Loads `worklock.toml` from the project root, falling back to
    /// defaults when the file does not exist. A present-but-invalid file
    /// is an error: silently ignoring it would mask a typo.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path).map_err(|e| ConfigError::Io(path.clone(), e))?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn store_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.store_dir)
    }

    pub fn locks_dir(&self, project_root: &Path) -> PathBuf {
        self.store_dir(project_root).join("locks")
    }

    pub fn sessions_dir(&self, project_root: &Path) -> PathBuf {
        self.store_dir(project_root).join("sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn absent_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.store_dir, PathBuf::from(".worklock"));
        assert_eq!(config.branch_prefix, "session/");
        assert_eq!(config.base_branch, "main");
        assert_eq!(
            config.locks_dir(dir.path()),
            dir.path().join(".worklock/locks")
        );
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "branch_prefix = \"agent/\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.branch_prefix, "agent/");
        assert_eq!(config.store_dir, PathBuf::from(".worklock"));
    }

    #[test]
    fn invalid_file_is_an_error_not_a_silent_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "store_dir = [1, 2]").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ConfigError::Parse(_, _))
        ));
    }

    #[test]
    fn absolute_store_dir_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            store_dir: PathBuf::from("/var/lib/worklock"),
            ..Config::default()
        };
        assert_eq!(
            config.sessions_dir(dir.path()),
            PathBuf::from("/var/lib/worklock/sessions")
        );
    }
}
