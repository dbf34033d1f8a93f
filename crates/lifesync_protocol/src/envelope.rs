//! Wire envelope and remote failure classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Substrings that mark a remote "does not exist" failure.
const NOT_FOUND_MARKERS: &[&str] = &["不存在", "not found"];

/// Substrings that mark a remote "already exists" failure.
const ALREADY_EXISTS_MARKERS: &[&str] = &["已存在", "already exists", "duplicate"];

/// A remote API response: `{code, message, data}`.
///
/// `code == 0` is success; any other code is a failure described by
/// `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Result code, `0` on success.
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Payload, absent on most failures.
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    /// Creates a success envelope.
    pub fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: "ok".into(),
            data: Some(data),
        }
    }

    /// Creates a success envelope without a payload.
    pub fn empty() -> Self {
        Self {
            code: 0,
            message: "ok".into(),
            data: None,
        }
    }

    /// Creates a failure envelope.
    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if `code == 0`.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Converts into the payload, or a [`RemoteFailure`] for non-zero codes.
    pub fn into_result(self, status: Option<u16>) -> Result<Option<T>, RemoteFailure> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(RemoteFailure::new(status, Some(self.code), self.message))
        }
    }
}

/// How a remote failure should be treated by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The record is absent remotely. Benign for deletes.
    NotFound,
    /// The record already exists remotely. Create should become update.
    AlreadyExists,
    /// Any other failure.
    Other,
}

/// A failure reported by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote failure (status {status:?}, code {code:?}): {message}")]
pub struct RemoteFailure {
    /// HTTP status, if the failure came with one.
    pub status: Option<u16>,
    /// Envelope code, if the body could be decoded.
    pub code: Option<i64>,
    /// Message from the envelope or transport.
    pub message: String,
}

impl RemoteFailure {
    /// Creates a remote failure.
    pub fn new(status: Option<u16>, code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Classifies this failure.
    pub fn kind(&self) -> FailureKind {
        classify_failure(self.status, &self.message)
    }
}

/// Classifies a failure by HTTP status and message text.
///
/// A 404 status or a message containing "不存在" / "not found" means the
/// record is absent remotely. A 409 status or "已存在" / "already exists"
/// means it is already present. Matching is case-insensitive.
pub fn classify_failure(status: Option<u16>, message: &str) -> FailureKind {
    let lowered = message.to_lowercase();
    if status == Some(404) || NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
        FailureKind::NotFound
    } else if status == Some(409) || ALREADY_EXISTS_MARKERS.iter().any(|m| lowered.contains(m)) {
        FailureKind::AlreadyExists
    } else {
        FailureKind::Other
    }
}
