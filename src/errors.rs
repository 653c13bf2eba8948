// src/errors.rs

//! Crate-wide error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single transform step on a single input file.
///
/// Steps never write to disk, so a `ProcessingError` always means that
/// nothing was written for the pipeline invocation that raised it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{step} failed on {}: {message}", file.display())]
pub struct ProcessingError {
    pub step: String,
    pub file: PathBuf,
    pub message: String,
}

impl ProcessingError {
    pub fn new(
        step: impl Into<String>,
        file: impl Into<PathBuf>,
        message: impl ToString,
    ) -> Self {
        Self {
            step: step.into(),
            file: file.into(),
            message: message.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SitepipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    TaskCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(String),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("Dev server error: {0}")]
    Server(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<globset::Error> for SitepipeError {
    fn from(err: globset::Error) -> Self {
        SitepipeError::Pattern(err.to_string())
    }
}

impl From<notify::Error> for SitepipeError {
    fn from(err: notify::Error) -> Self {
        SitepipeError::Other(anyhow::Error::new(err).context("file watcher"))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitepipeError>;
