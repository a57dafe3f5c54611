//! Error types for the Banquet core.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for Banquet operations.
///
/// Expected business states (capacity exceeded, unresolved conflicts) are
/// *not* errors; they surface as turn outcomes. Everything here is either a
/// caller mistake or a broken integration.
#[derive(Error, Debug, Clone)]
pub enum BanquetError {
    /// The caller attempted a transition the state machine forbids, e.g.
    /// deciding a non-Pending approval or submitting a duplicate one.
    #[error("Invalid transition for process {process_id}: {message}")]
    InvalidTransition { process_id: Uuid, message: String },

    /// A step was invoked with prerequisites the Guard Engine would have
    /// blocked. Programming/integration error; fails fast.
    #[error("Missing prerequisite at step {step}: {message}")]
    MissingPrerequisite { step: u8, message: String },

    /// No process record with this id.
    #[error("Process {0} not found")]
    ProcessNotFound(Uuid),

    /// No approval request with this id.
    #[error("Approval request {0} not found")]
    ApprovalNotFound(Uuid),

    /// The process store failed to load or save a snapshot.
    #[error("Store error: {message}")]
    StoreError { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BanquetError {
    /// Returns true if this error is the caller's fault rather than ours.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            BanquetError::InvalidTransition { .. }
                | BanquetError::ProcessNotFound(_)
                | BanquetError::ApprovalNotFound(_)
        )
    }

    /// Returns the process ID if the error carries one.
    pub fn process_id(&self) -> Option<Uuid> {
        match self {
            BanquetError::InvalidTransition { process_id, .. } => Some(*process_id),
            BanquetError::ProcessNotFound(id) => Some(*id),
            _ => None,
        }
    }
}

/// Convenience Result type for Banquet operations.
pub type Result<T> = std::result::Result<T, BanquetError>;

impl From<serde_json::Error> for BanquetError {
    fn from(err: serde_json::Error) -> Self {
        BanquetError::Serialization(err.to_string())
    }
}
