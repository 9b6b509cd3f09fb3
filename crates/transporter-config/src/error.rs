//! Error types for configuration loading

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot access config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config has no sources")]
    NoSources,

    #[error("source {name:?} is invalid: {reason}")]
    InvalidSource { name: String, reason: String },

    #[error("source name {0:?} is used more than once")]
    DuplicateSource(String),

    #[error("cannot serialize config: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("Security error: {0}")]
    Secret(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
