//! # Application Errors
//!
//! Errors raised by the app layer: configuration, collaborators, transport.
//! Engine errors are wrapped unchanged.

use thiserror::Error;
use veritas_core::VeritasError;

/// Errors that can occur outside the core engine.
#[derive(Debug, Error)]
pub enum AppError {
    /// An engine error.
    #[error(transparent)]
    Core(#[from] VeritasError),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An HTTP call to a collaborator failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A collaborator answered with something unusable.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// The retrieval engine has not finished building.
    #[error("Retrieval engine is still building, retry shortly")]
    NotReady,

    /// A background task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}
