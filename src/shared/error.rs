use thiserror::Error;
use std::io;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),

    #[error("Collection failed: {0}")]
    Collection(#[from] CollectionError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Failed to register signal handlers: {0}")]
    Signal(#[source] io::Error),
}

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse data: {0}")]
    Parse(String),

    #[error("System API error: {0}")]
    SystemApi(String),
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No collector.yml found in any of these locations: {0:?}")]
    NotFound(Vec<PathBuf>),

    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),
}
