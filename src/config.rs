//! Runtime configuration: an optional JSON file, then environment overrides.

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

pub const CONFIG_PATH_VAR: &str = "JUKEBOX_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub command_prefix: String,
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub idle_poll_interval: Duration,
    pub connect_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub connect_base_delay: Duration,
    pub ytdlp_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_prefix: "`".to_string(),
            idle_timeout: Duration::from_secs(5 * 60),
            idle_poll_interval: Duration::from_secs(30),
            connect_attempts: 4,
            connect_base_delay: Duration::from_secs(5),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Config {
    /// Reads the file named by `JUKEBOX_CONFIG` if set, then applies env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        info!("Loading configuration from {}", path.display());
        Self::from_json(&raw).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Applies `COMMAND_PREFIX`, `IDLE_TIMEOUT` and friends from `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(prefix) = lookup("COMMAND_PREFIX") {
            self.command_prefix = prefix;
        }
        if let Some(value) = lookup("IDLE_TIMEOUT") {
            self.idle_timeout = parse_duration("IDLE_TIMEOUT", &value)?;
        }
        if let Some(value) = lookup("IDLE_POLL_INTERVAL") {
            self.idle_poll_interval = parse_duration("IDLE_POLL_INTERVAL", &value)?;
        }
        if let Some(value) = lookup("CONNECT_ATTEMPTS") {
            self.connect_attempts =
                value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                        name: "CONNECT_ATTEMPTS",
                        reason: e.to_string(),
                    })?;
        }
        if let Some(value) = lookup("CONNECT_BASE_DELAY") {
            self.connect_base_delay = parse_duration("CONNECT_BASE_DELAY", &value)?;
        }
        if let Some(path) = lookup("YTDLP_PATH") {
            self.ytdlp_path = path;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_prefix.is_empty() {
            return Err(invalid("COMMAND_PREFIX", "must not be empty"));
        }
        if self.idle_poll_interval.is_zero() {
            return Err(invalid("IDLE_POLL_INTERVAL", "must be greater than zero"));
        }
        if self.idle_poll_interval > self.idle_timeout {
            return Err(invalid(
                "IDLE_POLL_INTERVAL",
                "must not be longer than IDLE_TIMEOUT",
            ));
        }
        if self.connect_attempts == 0 {
            return Err(invalid("CONNECT_ATTEMPTS", "must be at least 1"));
        }
        Ok(())
    }

    pub fn discord_token() -> Result<String, ConfigError> {
        env::var("DISCORD_TOKEN").map_err(|_| ConfigError::Missing("DISCORD_TOKEN"))
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn parse_duration(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
