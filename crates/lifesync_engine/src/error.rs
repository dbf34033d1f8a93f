//! Error types for the sync engine.

use lifesync_protocol::{FailureKind, RemoteFailure};
use lifesync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Only [`SyncError::LocalStorage`] and [`SyncError::Codec`] are local; every
/// other variant describes a remote-facing failure that the coordinator
/// logs and swallows.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The local key-value store failed.
    #[error("local storage error: {0}")]
    LocalStorage(#[from] StorageError),

    /// A stored blob could not be encoded or decoded.
    #[error("codec error for {key}: {source}")]
    Codec {
        /// Storage key or record being processed.
        key: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// Network or transport error.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote call did not finish within the configured timeout.
    #[error("operation timed out")]
    Timeout,

    /// The remote reports the record as absent.
    #[error("remote record not found: {0}")]
    RemoteNotFound(String),

    /// The remote reports the record as already present.
    #[error("remote record already exists: {0}")]
    RemoteAlreadyExists(String),

    /// Any other remote failure.
    #[error("remote error (code {code}): {message}")]
    Remote {
        /// Envelope code, or HTTP status when no envelope was decoded.
        code: i64,
        /// Error message.
        message: String,
    },

    /// The remote answered with something that is not a valid envelope.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SyncError {
    /// Creates a retryable network error.
    pub fn network_retryable(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a codec error for `key`.
    pub fn codec(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Codec {
            key: key.into(),
            source,
        }
    }

    /// Maps a classified remote failure onto the taxonomy.
    pub fn from_failure(failure: RemoteFailure) -> Self {
        match failure.kind() {
            FailureKind::NotFound => Self::RemoteNotFound(failure.message),
            FailureKind::AlreadyExists => Self::RemoteAlreadyExists(failure.message),
            FailureKind::Other => Self::Remote {
                code: failure
                    .code
                    .or(failure.status.map(i64::from))
                    .unwrap_or(-1),
                message: failure.message,
            },
        }
    }

    /// Returns true if this error comes from local storage.
    pub fn is_local(&self) -> bool {
        matches!(self, SyncError::LocalStorage(_) | SyncError::Codec { .. })
    }

    /// Returns true if the remote reported the record as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::RemoteNotFound(_))
    }

    /// Returns true if the remote reported the record as already present.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, SyncError::RemoteAlreadyExists(_))
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network { retryable, .. } => *retryable,
            SyncError::Timeout => true,
            SyncError::Remote { code, .. } => *code >= 500,
            _ => false,
        }
    }
}
