use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "networking.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub google: GoogleConfig,
    pub dashboard: DashboardConfig,
    pub imports: ImportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_uri: String,
    pub api_base: String,
    pub page_size: u32,
    pub calendar_page_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub due_limit: usize,
    pub frequent_limit: usize,
    pub frequent_window_days: i64,
    pub recent_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    pub default_frequency_days: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            api_base: "https://www.googleapis.com".to_string(),
            page_size: 500,
            calendar_page_size: 2500,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            due_limit: 20,
            frequent_limit: 10,
            frequent_window_days: 90,
            recent_limit: 10,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_frequency_days: 7,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "I/O error reading config: {}", err),
            ConfigError::Toml(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Invalid(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Toml(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

impl Config {
    /// A missing file yields the defaults; a present but broken file is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind cannot be empty".to_string()));
        }
        if self.google.page_size == 0 || self.google.calendar_page_size == 0 {
            return Err(ConfigError::Invalid(
                "google page sizes must be greater than zero".to_string(),
            ));
        }
        let dashboard = &self.dashboard;
        if dashboard.due_limit == 0 || dashboard.frequent_limit == 0 || dashboard.recent_limit == 0
        {
            return Err(ConfigError::Invalid(
                "dashboard limits must be greater than zero".to_string(),
            ));
        }
        if dashboard.frequent_window_days <= 0 {
            return Err(ConfigError::Invalid(
                "dashboard.frequent_window_days must be positive".to_string(),
            ));
        }
        if self.imports.default_frequency_days <= 0 {
            return Err(ConfigError::Invalid(
                "imports.default_frequency_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
