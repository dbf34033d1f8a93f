//! Error types for entity services.

use crate::model::ReviewType;
use lifesync_engine::SyncError;
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors returned by public service calls.
///
/// Remote failures never appear here: they are logged and retried by the
/// sync coordinator. A call fails only when local storage fails, a domain
/// rule forbids it, the target does not exist or the input is invalid.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Local storage failed.
    #[error(transparent)]
    Local(#[from] SyncError),

    /// A domain rule rejected the operation.
    #[error("policy violation: {0}")]
    Policy(#[from] PolicyViolation),

    /// The target record does not exist locally.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity collection.
        kind: &'static str,
        /// Requested id.
        id: String,
    },

    /// The input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Creates a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns true for local storage failures.
    pub fn is_local(&self) -> bool {
        matches!(self, ServiceError::Local(_))
    }

    /// Returns the policy violation, if this is one.
    pub fn policy(&self) -> Option<&PolicyViolation> {
        match self {
            ServiceError::Policy(violation) => Some(violation),
            _ => None,
        }
    }
}

/// Domain rules that reject an operation. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    /// The daily task was already exported to the task collection.
    #[error("daily task {id} was exported and can no longer be deleted")]
    ExportedDailyTaskDelete {
        /// Daily task id.
        id: String,
    },

    /// The daily task was already exported to the task collection.
    #[error("daily task {id} was exported and can no longer be uncompleted")]
    ExportedDailyTaskUncomplete {
        /// Daily task id.
        id: String,
    },

    /// Only the review of the current period may be edited.
    #[error("{review_type} review {period} is read-only; the current period is {current}")]
    ReviewOutsideEditWindow {
        /// Review granularity.
        review_type: ReviewType,
        /// Period of the review being edited.
        period: String,
        /// Current period for that granularity.
        current: String,
    },
}
