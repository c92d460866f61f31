//! `dealias.toml` configuration.
//!
//! Looked up in order: an explicit `--config` path, `./dealias.toml`, then
//! `<config dir>/dealias/config.toml` (e.g. `~/.config/dealias/config.toml`).
//! A missing file means defaults; an unreadable or invalid one is an error.
//!
//! ```toml
//! intern_fragments = true
//! output_format = "yaml"
//! pretty = true
//! log = "debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Project-local config filename
pub const LOCAL_CONFIG_FILENAME: &str = "dealias.toml";
/// Directory under the platform config dir
const CONFIG_DIR: &str = "dealias";
/// Filename inside [`CONFIG_DIR`]
const USER_CONFIG_FILENAME: &str = "config.toml";

/// Config errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`Config`].
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// Serialization format for written documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

/// Tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Share one node between identical schema fragments when loading.
    pub intern_fragments: bool,
    /// Output format when the output path does not decide it.
    pub output_format: OutputFormat,
    /// Pretty-print JSON output.
    pub pretty: bool,
    /// Log level or filter; `DEALIAS_LOG` takes precedence.
    pub log: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intern_fragments: true,
            output_format: OutputFormat::Json,
            pretty: true,
            log: None,
        }
    }
}

impl Config {
    /// Read and parse one config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate and load the config, returning it with the file it came from.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        Self::discover_from(explicit, Path::new("."), user_config_path())
    }

    /// [`Config::discover`] with the working directory and user config path
    /// supplied by the caller.
    pub fn discover_from(
        explicit: Option<&Path>,
        cwd: &Path,
        user_path: Option<PathBuf>,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::from_file(path)?, Some(path.to_path_buf())));
        }

        let candidates = std::iter::once(cwd.join(LOCAL_CONFIG_FILENAME)).chain(user_path);
        for path in candidates {
            if path.is_file() {
                debug!(path = %path.display(), "Loading config file.");
                return Ok((Self::from_file(&path)?, Some(path)));
            }
        }

        debug!("No config file found, using defaults.");
        Ok((Self::default(), None))
    }
}

/// Per-user config path (`<config dir>/dealias/config.toml`), if the platform
/// has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(USER_CONFIG_FILENAME))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_files() {
        let temp_dir = TempDir::new().unwrap();
        let (config, path) = Config::discover_from(None, temp_dir.path(), None).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.intern_fragments);
        assert_eq!(path, None);
    }

    #[test]
    fn test_local_file_beats_user_file() {
        let temp_dir = TempDir::new().unwrap();
        let local = temp_dir.path().join(LOCAL_CONFIG_FILENAME);
        fs::write(&local, "output_format = \"yaml\"\n").unwrap();
        let user = temp_dir.path().join("user.toml");
        fs::write(&user, "pretty = false\n").unwrap();

        let (config, path) =
            Config::discover_from(None, temp_dir.path(), Some(user.clone())).unwrap();
        assert_eq!(config.output_format, OutputFormat::Yaml);
        assert!(config.pretty);
        assert_eq!(path, Some(local.clone()));

        fs::remove_file(&local).unwrap();
        let (config, path) = Config::discover_from(None, temp_dir.path(), Some(user.clone())).unwrap();
        assert!(!config.pretty);
        assert_eq!(path, Some(user));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        let err = Config::discover_from(Some(&missing), temp_dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "intern = false\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = Config {
            intern_fragments: false,
            output_format: OutputFormat::Yaml,
            pretty: false,
            log: Some("debug".into()),
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }
}
