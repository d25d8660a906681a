//! Errors raised while taking a policy snapshot

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during a snapshot run
///
/// None of these are recovered from inside the pipeline: the first one
/// aborts the run and is returned to the caller.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The AWS configuration file is missing, unreadable or malformed
    #[error("configuration unavailable at {}: {reason}", path.display())]
    ConfigurationUnavailable {
        /// Path of the configuration file
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
    /// Credentials for a profile could not be resolved or were rejected
    #[error("authentication failed for profile {profile}: {reason}")]
    AuthenticationFailure {
        /// Profile the session was scoped to
        profile: String,
        /// Provider message
        reason: String,
    },
    /// A policy API call was rejected or returned an unusable response
    #[error("{operation} failed for profile {profile}: {reason}")]
    ApiError {
        /// Profile the session was scoped to
        profile: String,
        /// API operation name
        operation: &'static str,
        /// Provider message
        reason: String,
    },
    /// A value in the record cannot be represented as JSON
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
    /// A directory or file under the output root could not be written
    #[error("filesystem error at {}: {source}", path.display())]
    FilesystemError {
        /// Path being created or written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::UnsupportedType(err.to_string())
    }
}

impl SnapshotError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnapshotError::FilesystemError {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T, E = SnapshotError> = std::result::Result<T, E>;
