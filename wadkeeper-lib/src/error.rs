use std::path::PathBuf;

use thiserror::Error;
use wadkeeper_core::StoreError;

/// Errors that stop a launch attempt.
///
/// Precondition failures (`AlreadyPlaying`, `NoSourcePorts`, `NoIwads`)
/// carry the message shown to the user as their `Display`.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A session is already running
    #[error("Already playing. Close the running source port before starting another.")]
    AlreadyPlaying,

    /// No source ports are configured
    #[error("No source ports are configured. Add a source port before playing.")]
    NoSourcePorts,

    /// No IWADs are registered
    #[error("No IWADs are registered. Add an IWAD before playing.")]
    NoIwads,

    /// The session needs an IWAD and none could be resolved
    #[error("No IWAD selected for '{0}'. Select an IWAD or set a default IWAD.")]
    MissingIwad(String),

    /// The source port executable does not exist
    #[error("Source port executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    /// Referenced library files are missing
    #[error("The following files were not found: {}", .0.join(", "))]
    MissingFiles(Vec<String>),

    /// A library archive could not be read
    #[error("Could not read archive '{archive}': {message}")]
    InvalidArchive { archive: String, message: String },

    /// The request asks for something the port cannot do
    #[error("{0}")]
    Unsupported(String),

    /// Starting the process failed
    #[error("Failed to start source port: {0}")]
    Spawn(std::io::Error),

    /// I/O error while staging files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LaunchError {
    pub fn invalid_archive(archive: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidArchive {
            archive: archive.into(),
            message: message.to_string(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

/// Errors reading or writing the launcher settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Unknown dotted key passed to `set_setting`
    #[error("Unknown setting '{0}'")]
    UnknownKey(String),
}
