//! Layered configuration: built-in defaults, then an optional TOML file, then command-line
//! overrides applied by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::chat_session::DEFAULT_REQUEST_TIMEOUT;
use crate::credentials::FileCredentialStore;
use crate::errors::ChatError;
use crate::llm::DEFAULT_API_BASE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the OpenAI-compatible API.
    pub api_base: String,
    /// Seconds to wait for a reply before giving up.
    pub request_timeout_secs: u64,
    /// Where the API key and system prompt are stored.
    pub credentials_file: Option<PathBuf>,
    /// Log level: error, warn, info, debug or trace.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            credentials_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf, ChatError> {
        dirs::config_dir()
            .map(|dir| dir.join("sparkchat").join("config.toml"))
            .ok_or_else(|| ChatError::Config("Could not determine config directory".to_string()))
    }

    pub fn from_str(content: &str) -> Result<Self, ChatError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| ChatError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, or the defaults when the file does not exist.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ChatError> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ChatError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_str(&content)
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.api_base.is_empty() {
            return Err(ChatError::Config("api_base must not be empty".to_string()));
        }
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ChatError::Config(format!(
                "api_base must be an http(s) URL: {}",
                self.api_base
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ChatError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ChatError> {
        self.log_level.parse().map_err(|_| {
            ChatError::Config(format!(
                "log_level must be one of off, error, warn, info, debug, trace: {}",
                self.log_level
            ))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn credentials_path(&self) -> Result<PathBuf, ChatError> {
        match &self.credentials_file {
            Some(path) => Ok(path.clone()),
            None => FileCredentialStore::default_path(),
        }
    }

    /// A commented config file holding the default values.
    pub fn serialize_default() -> String {
        let defaults = Config::default();
        [
            "# Base URL of the OpenAI-compatible API.".to_string(),
            format!("api_base = \"{}\"", defaults.api_base),
            String::new(),
            "# Seconds to wait for a reply before giving up.".to_string(),
            format!("request_timeout_secs = {}", defaults.request_timeout_secs),
            String::new(),
            "# Where the API key and system prompt are stored.".to_string(),
            "# credentials_file = \"\"".to_string(),
            String::new(),
            "# Log level [possible values: off, error, warn, info, debug, trace]".to_string(),
            format!("log_level = \"{}\"", defaults.log_level),
        ]
        .join("\n")
    }
}
