//! Client configuration.
//!
//! # Responsibility
//! - Build `ClientConfig` from `GROCERY_*` environment variables, with a
//!   `.env` file honoured for local development.
//! - Validate paths and the API base URL before anything is opened.
//!
//! # Invariants
//! - Every configured path is absolute.
//! - The API base URL uses `http` or `https`.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const ENV_API_BASE_URL: &str = "GROCERY_API_BASE_URL";
/// Base directory for the default database, documents and log paths.
pub const ENV_DATA_DIR: &str = "GROCERY_DATA_DIR";
pub const ENV_DATABASE_PATH: &str = "GROCERY_DATABASE_PATH";
pub const ENV_DOCUMENTS_DIR: &str = "GROCERY_DOCUMENTS_DIR";
pub const ENV_LOG_DIR: &str = "GROCERY_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "GROCERY_LOG_LEVEL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "GROCERY_REQUEST_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "http://10.0.2.2:8080/api/";
const DATABASE_FILE_NAME: &str = "grocery.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidValue { var: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingVar(var) => write!(f, "missing environment variable {var}"),
            Self::InvalidValue { var, message } => write!(f, "invalid value for {var}: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: Url,
    pub database_path: PathBuf,
    pub documents_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// `None` leaves requests without a client-side timeout.
    pub request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Default layout under `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data_dir = data_dir.as_ref();
        let config = Self {
            api_base_url: parse_base_url(ENV_API_BASE_URL, DEFAULT_API_BASE_URL)?,
            database_path: data_dir.join(DATABASE_FILE_NAME),
            documents_dir: data_dir.join("documents"),
            log_dir: data_dir.join("logs"),
            log_level: default_log_level().to_string(),
            request_timeout_secs: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var: &str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let data_dir = read(ENV_DATA_DIR).ok_or(ConfigError::MissingVar(ENV_DATA_DIR))?;
        let mut config = Self::with_data_dir(&data_dir).map_err(|err| match err {
            ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
                var: ENV_DATA_DIR,
                message,
            },
            other => other,
        })?;

        if let Some(url) = read(ENV_API_BASE_URL) {
            config.api_base_url = parse_base_url(ENV_API_BASE_URL, &url)?;
        }
        if let Some(path) = read(ENV_DATABASE_PATH) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = read(ENV_DOCUMENTS_DIR) {
            config.documents_dir = PathBuf::from(path);
        }
        if let Some(path) = read(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(path);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(secs) = read(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = secs.parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                var: ENV_REQUEST_TIMEOUT_SECS,
                message: err.to_string(),
            })?;
            config.request_timeout_secs = (secs > 0).then_some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_absolute(ENV_DATABASE_PATH, &self.database_path)?;
        require_absolute(ENV_DOCUMENTS_DIR, &self.documents_dir)?;
        require_absolute(ENV_LOG_DIR, &self.log_dir)?;
        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                var: ENV_API_BASE_URL,
                message: format!("unsupported scheme `{}`", self.api_base_url.scheme()),
            });
        }
        Ok(())
    }
}

fn parse_base_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|err| ConfigError::InvalidValue {
        var,
        message: err.to_string(),
    })
}

fn require_absolute(var: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_absolute() {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        var,
        message: format!("`{}` must be an absolute path", path.display()),
    })
}
