//! Configuration model for ctlbreak.
//!
//! Exactly three locations are recognized: where records come from, where
//! totals go, and where in-flight state is checkpointed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Top-level configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// CSV file of `key,value` records
    pub input_file: PathBuf,

    /// CSV file receiving `key,total` rows on success
    pub output_file: PathBuf,

    /// Checkpoint file for resumable runs
    pub state_file: PathBuf,
}

impl Config {
    /// Load configuration from a TOML file, or JSON if the extension is `.json`.
    ///
    /// `${VAR}` placeholders in paths are expanded from the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Config = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
                path: path.to_owned(),
                source: e,
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::ParseToml {
                path: path.to_owned(),
                source: e,
            })?
        };

        let config = config.expanded();
        config.validate()?;
        Ok(config)
    }

    /// Reject empty locations, which serde accepts as valid strings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("input_file", &self.input_file),
            ("output_file", &self.output_file),
            ("state_file", &self.state_file),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::EmptyPath(field));
            }
        }
        Ok(())
    }

    fn expanded(self) -> Self {
        Self {
            input_file: expand_path(&self.input_file),
            output_file: expand_path(&self.output_file),
            state_file: expand_path(&self.state_file),
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(expand_env_vars(s)),
        None => path.to_path_buf(),
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

    re.replace_all(s, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Config key '{0}' must not be empty")]
    EmptyPath(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "input_file = \"in.csv\"\noutput_file = \"out.csv\"\nstate_file = \"state.json\"\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.input_file, PathBuf::from("in.csv"));
        assert_eq!(config.output_file, PathBuf::from("out.csv"));
        assert_eq!(config.state_file, PathBuf::from("state.json"));
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"input_file": "in.csv", "output_file": "out.csv", "state_file": "state.json"}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.state_file, PathBuf::from("state.json"));
    }

    #[test]
    fn test_missing_key_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "input_file = \"in.csv\"\noutput_file = \"out.csv\"\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("state_file"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"input_file": "a", "output_file": "b", "state_file": "c", "batch_size": 10}"#,
        )
        .unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::from_file(&temp_dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_empty_path_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "input_file = \"in.csv\"\noutput_file = \"\"\nstate_file = \"state.json\"\n",
        )
        .unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPath("output_file")));
    }

    #[test]
    fn test_expand_env_vars() {
        // PATH is set in any environment that can run cargo.
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("${PATH}/x"), format!("{path}/x"));
        assert_eq!(
            expand_env_vars("${CTLBREAK_SURELY_UNSET_VAR}/x"),
            "${CTLBREAK_SURELY_UNSET_VAR}/x"
        );
        assert_eq!(expand_env_vars("plain.csv"), "plain.csv");
    }
}
