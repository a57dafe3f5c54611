//! HTTP API handlers.

pub mod approval;
pub mod health;
pub mod process;

use axum::http::StatusCode;
use banquet_core::BanquetError;

/// Map a core error to an HTTP status and message.
pub(crate) fn status_for(err: BanquetError) -> (StatusCode, String) {
    let status = match &err {
        BanquetError::ProcessNotFound(_) | BanquetError::ApprovalNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        BanquetError::InvalidTransition { .. } => StatusCode::CONFLICT,
        BanquetError::MissingPrerequisite { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
