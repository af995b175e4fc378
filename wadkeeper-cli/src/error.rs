use thiserror::Error;
use wadkeeper_core::StoreError;
use wadkeeper_import::LibraryError;
use wadkeeper_lib::{LaunchError, SettingsError};

/// Errors that can occur during CLI command execution.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Database could not be opened or queried
    #[error("Database error: {0}")]
    Database(String),

    /// Settings file error
    #[error("Config error: {0}")]
    Config(#[from] SettingsError),

    /// A launch precondition or launch step failed
    #[error("{0}")]
    Launch(#[from] LaunchError),

    /// Library maintenance failed
    #[error("{0}")]
    Library(#[from] LibraryError),

    /// Runtime creation or async error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Output formatting failed
    #[error("Output error: {0}")]
    Output(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl CliError {
    pub(crate) fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub(crate) fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    pub(crate) fn output(msg: impl Into<String>) -> Self {
        Self::Output(msg.into())
    }

    pub(crate) fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::database(e.to_string())
    }
}
