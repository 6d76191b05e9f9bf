//! Error types for the settings client.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed schema file {path:?} at byte {position}: {message}")]
    SchemaParse {
        path: PathBuf,
        position: usize,
        message: String,
    },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Settings bus error: {0}")]
    Bus(String),

    #[error("No value available for {0}")]
    Unavailable(String),

    #[error("Invalid boolean value: {0:?}")]
    InvalidBoolean(String),

    #[error("Invalid integer value: {0:?}")]
    InvalidInteger(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<zbus::Error> for SettingsError {
    fn from(e: zbus::Error) -> Self {
        SettingsError::Bus(e.to_string())
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(e: toml::de::Error) -> Self {
        SettingsError::Config(e.to_string())
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
