// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsTriggerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid file pattern: {0}")]
    Pattern(String),

    #[error("The given file '{}' doesn't exist.", .0.display())]
    NotFound(PathBuf),

    #[error("Unexpected file format: {0}")]
    Format(String),

    #[error("Call to host '{host}' failed: {message}")]
    Transport { host: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FsTriggerError {
    /// Configuration problems are never fixed by waiting for the next poll.
    pub fn is_fatal_config(&self) -> bool {
        matches!(self, FsTriggerError::ConfigError(_) | FsTriggerError::Pattern(_))
    }

    pub fn transport(host: impl Into<String>, message: impl Into<String>) -> Self {
        FsTriggerError::Transport {
            host: host.into(),
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FsTriggerError>;
