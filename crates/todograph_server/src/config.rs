//! Server configuration.
//!
//! Values come from defaults, then an optional TOML file, then environment
//! variables. Relative paths are resolved against the working directory.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use todograph_core::{default_log_level, LoggingConfig};

const ENV_BIND: &str = "TODOGRAPH_BIND";
const ENV_DB_PATH: &str = "TODOGRAPH_DB_PATH";
const ENV_LOG_DIR: &str = "TODOGRAPH_LOG_DIR";
const ENV_LOG_LEVEL: &str = "TODOGRAPH_LOG_LEVEL";
const ENV_PEXELS_API_KEY: &str = "PEXELS_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub bind: String,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Enables image enrichment when set.
    pub pexels_api_key: Option<String>,
    pub image_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            db_path: PathBuf::from("todograph.sqlite3"),
            log_dir: PathBuf::from("logs"),
            log_level: default_log_level().to_string(),
            pexels_api_key: None,
            image_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    InvalidValue { key: &'static str, message: String },
    WorkingDir(std::io::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
            Self::WorkingDir(err) => write!(f, "cannot resolve working directory: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::WorkingDir(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        let base = std::env::current_dir().map_err(ConfigError::WorkingDir)?;
        config.resolve_paths(&base);
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw).map_err(ConfigError::Parse)?;
        config.pexels_api_key = config
            .pexels_api_key
            .filter(|key| !key.trim().is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Overrides fields from environment-style lookups.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(db_path);
        }
        if let Some(log_dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(log_dir);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(key) = lookup(ENV_PEXELS_API_KEY).filter(|key| !key.trim().is_empty()) {
            self.pexels_api_key = Some(key);
        }
        self.validate()
    }

    /// Makes `db_path` and `log_dir` absolute relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.db_path.is_relative() {
            self.db_path = base.join(&self.db_path);
        }
        if self.log_dir.is_relative() {
            self.log_dir = base.join(&self.log_dir);
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            echo_stderr: true,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "bind",
                message: "cannot be empty".to_string(),
            });
        }
        if self.image_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "image_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
