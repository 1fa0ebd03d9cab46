//! Configuration management for the bot.
//!
//! Configuration is read from `~/.config/fefe-bot/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// Feed polled when the config does not name one.
pub const DEFAULT_FEED_URL: &str = "https://blog.fefe.de/rss.xml?html";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matrix: MatrixConfig,
    pub feed: FeedConfig,
    pub database: DatabaseConfig,
}

/// Chat account settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    pub homeserver: String,
    pub access_token: String,
    pub display_name: String,
    pub command_prefix: String,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            homeserver: "https://matrix.org".to_string(),
            access_token: String::new(),
            display_name: "Fefe Bot".to_string(),
            command_prefix: "!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            poll_interval_secs: 60,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` places it in the user's data directory.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it if absent.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Get the default config file path: `~/.config/fefe-bot/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("fefe-bot").join("config.toml"))
    }

    /// Check the values the bot cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix.access_token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "matrix.access_token is not set".to_string(),
            ));
        }
        if self.matrix.command_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "matrix.command_prefix must not be empty".to_string(),
            ));
        }
        if self.feed.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "feed.poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Url::parse(&self.matrix.homeserver).map_err(|e| {
            ConfigError::Invalid(format!("matrix.homeserver is not a URL: {}", e))
        })?;
        Url::parse(&self.feed.url)
            .map_err(|e| ConfigError::Invalid(format!("feed.url is not a URL: {}", e)))?;
        Ok(())
    }

    /// Resolve the database path, creating the data directory when defaulted.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.database.path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        let bot_dir = data_dir.join("fefe-bot");
        fs::create_dir_all(&bot_dir).map_err(|e| ConfigError::Io {
            path: bot_dir.clone(),
            source: e,
        })?;
        Ok(bot_dir.join("fefe.sqlite3"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# fefe-bot configuration

[matrix]
# Homeserver base URL
homeserver = "https://matrix.org"

# Access token of the bot account (required)
access_token = ""

# Display name set on startup
display_name = "Fefe Bot"

# Commands are recognized as <prefix><alias>, e.g. "!sub"
command_prefix = "!"

[feed]
url = "https://blog.fefe.de/rss.xml?html"

# Seconds between two polls
poll_interval_secs = 60

# HTTP timeout for a single feed request
request_timeout_secs = 30

[database]
# SQLite file; defaults to <data dir>/fefe-bot/fefe.sqlite3
# path = "fefe.sqlite3"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
