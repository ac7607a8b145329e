//! Error types
//!
//! - [`ProcessError`] carries a failed process's own error, unmodified.
//! - [`MuxError`] covers configuration and CLI input problems.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A process task failed.
///
/// Displays exactly as the error the task returned; the label is kept on the
/// side so the root cause is never wrapped.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct ProcessError {
    label: String,
    error: Arc<anyhow::Error>,
}

impl ProcessError {
    pub fn new(label: impl Into<String>, error: anyhow::Error) -> Self {
        Self {
            label: label.into(),
            error: Arc::new(error),
        }
    }

    /// Label of the process that failed
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The error as returned by the task
    pub fn inner(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Configuration and command line errors
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MuxError {
    #[error("failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid process file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no process file found. Expected muxrun.yml in the current directory or {user_path}")]
    ConfigNotFound { user_path: String },

    #[error("invalid process '{0}', expected LABEL=COMMAND")]
    ProcessArg(String),

    #[error("process '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("no processes to run")]
    NoProcesses,
}
