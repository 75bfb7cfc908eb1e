//! Collector configuration.
//!
//! The file is YAML with three sections (`collector`, `shamva`, `logging`).
//! Every field has a default so a file only needs to carry what differs,
//! which in practice is at least `shamva.agent_token`.

use crate::shared::error::ConfigError;
use log::LevelFilter;
use reqwest::header::{HeaderValue, InvalidHeaderValue};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SHAMVA_COLLECTOR_CONFIG";

pub const CONFIG_FILE_NAME: &str = "collector.yml";

pub const MAX_RETRIES_LIMIT: u32 = 10;

pub const DEFAULT_ENDPOINT: &str = "https://shamva.francocanzani.workers.dev/public/metrics";

// Raw file shape. Durations stay strings until `resolve`.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub collector: CollectorSection,
    pub shamva: ShamvaSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorSection {
    pub interval: String,
    pub max_retries: i64,
    pub initial_delay: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShamvaSection {
    pub endpoint: String,
    pub agent_token: String,
    pub timeout: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: String,
}

impl Default for CollectorSection {
    fn default() -> Self {
        Self {
            interval: String::from("60s"),
            max_retries: 3,
            initial_delay: String::from("30s"),
        }
    }
}

impl Default for ShamvaSection {
    fn default() -> Self {
        Self {
            endpoint: String::from(DEFAULT_ENDPOINT),
            agent_token: String::new(),
            timeout: String::from("30s"),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

// Resolved, validated configuration handed to the agent.

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub collector: CollectorConfig,
    pub shamva: ShamvaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub interval: Duration,
    pub max_retries: u32,
    pub initial_delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShamvaConfig {
    pub endpoint: Url,
    pub agent_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            format: LogFormat::Text,
        }
    }
}

/// Parse a duration string such as `30s`, `1m30s` or `500ms`.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidDuration {
            value: value.to_string(),
            reason: String::from("duration string is empty"),
        });
    }
    humantime::parse_duration(trimmed).map_err(|e| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl ConfigFile {
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Turn the raw file into an `AgentConfig`, rejecting out of range values.
    pub fn resolve(self) -> Result<AgentConfig, ConfigError> {
        let interval = parse_duration(&self.collector.interval)?;
        if interval.is_zero() {
            return Err(ConfigError::Validation(String::from(
                "collector interval must be greater than zero",
            )));
        }
        let initial_delay = parse_duration(&self.collector.initial_delay)?;

        let max_retries = self.collector.max_retries;
        if max_retries < 0 || max_retries > i64::from(MAX_RETRIES_LIMIT) {
            return Err(ConfigError::Validation(format!(
                "max_retries must be between 0 and {}, got {}",
                MAX_RETRIES_LIMIT, max_retries
            )));
        }

        let timeout = parse_duration(&self.shamva.timeout)?;
        if timeout.is_zero() {
            return Err(ConfigError::Validation(String::from(
                "shamva timeout must be greater than zero",
            )));
        }

        let endpoint = self.shamva.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::Validation(String::from(
                "shamva endpoint is required",
            )));
        }
        let endpoint = Url::parse(endpoint).map_err(|e| {
            ConfigError::Validation(format!("invalid shamva endpoint '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "shamva endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        if self.shamva.agent_token.trim().is_empty() {
            return Err(ConfigError::Validation(String::from(
                "shamva agent token is required",
            )));
        }
        if bearer_header(&self.shamva.agent_token).is_err() {
            return Err(ConfigError::Validation(String::from(
                "shamva agent token must be printable ASCII on a single line",
            )));
        }

        let logging = LoggingConfig {
            level: parse_level(&self.logging.level)?,
            format: parse_format(&self.logging.format)?,
        };

        Ok(AgentConfig {
            collector: CollectorConfig {
                interval,
                max_retries: max_retries as u32,
                initial_delay,
            },
            shamva: ShamvaConfig {
                endpoint,
                agent_token: self.shamva.agent_token,
                timeout,
            },
            logging,
        })
    }
}

/// `Authorization` value carrying the agent token, hidden from debug output.
pub fn bearer_header(token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

fn parse_level(level: &str) -> Result<LevelFilter, ConfigError> {
    level
        .trim()
        .parse::<LevelFilter>()
        .map_err(|_| ConfigError::Validation(format!("unknown log level '{}'", level)))
}

fn parse_format(format: &str) -> Result<LogFormat, ConfigError> {
    match format.trim().to_ascii_lowercase().as_str() {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(ConfigError::Validation(format!(
            "unknown log format '{}', expected 'text' or 'json'",
            other
        ))),
    }
}

impl AgentConfig {
    /// Read, parse and validate the file at `path`.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ConfigFile::from_yaml(path, &contents)?.resolve()
    }

    /// Locate the config file on the search path and load it.
    pub fn load() -> Result<(PathBuf, Self), ConfigError> {
        let path = find_config_file(&search_locations())?;
        let config = Self::from_path(&path)?;
        Ok((path, config))
    }
}

/// Candidate config locations, in priority order.
///
/// When `SHAMVA_COLLECTOR_CONFIG` is set it is the only candidate.
pub fn search_locations() -> Vec<PathBuf> {
    if let Some(explicit) = env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        return vec![PathBuf::from(explicit)];
    }

    let mut locations = vec![
        PathBuf::from(CONFIG_FILE_NAME),
        PathBuf::from("/etc/shamva").join(CONFIG_FILE_NAME),
        PathBuf::from("/usr/local/etc/shamva").join(CONFIG_FILE_NAME),
    ];
    if let Some(home) = env::var_os("HOME").filter(|v| !v.is_empty()) {
        locations.push(
            PathBuf::from(home)
                .join(".config")
                .join("shamva")
                .join(CONFIG_FILE_NAME),
        );
    }
    locations
}

pub fn find_config_file(locations: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    locations
        .iter()
        .find(|path| path.is_file())
        .map(|path| fs::canonicalize(path).unwrap_or_else(|_| path.clone()))
        .ok_or_else(|| ConfigError::NotFound(locations.to_vec()))
}
