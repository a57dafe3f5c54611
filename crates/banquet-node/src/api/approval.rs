//! Approval endpoints: the human decision channel.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use banquet_core::{ApprovalDecision, ApprovalRequest};
use banquet_engine::{apply_decision, TurnOutcome};
use serde::Deserialize;
use uuid::Uuid;

use super::status_for;
use crate::state::AppState;

/// Body of a decision on a pending approval request.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub approved: bool,
    /// For conflict resolutions: an explicit winner overrides the
    /// first-come-first-served default.
    pub winner_process_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Decide a pending approval request and resume the owning process.
pub async fn decide(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<TurnOutcome>, (StatusCode, String)> {
    let decision = ApprovalDecision {
        request_id: id,
        approved: body.approved,
        winner_process_id: body.winner_process_id,
        notes: body.notes,
    };

    let outcome = state
        .with_snapshot(|snapshot| apply_decision(snapshot, &decision, &state.catalog))
        .await
        .map_err(status_for)?;
    Ok(Json(outcome))
}

/// List approval requests, pending ones first.
pub async fn list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApprovalRequest>>, (StatusCode, String)> {
    let snapshot = state.read_snapshot().await.map_err(status_for)?;
    let mut requests: Vec<ApprovalRequest> = snapshot.approvals.values().cloned().collect();
    requests.sort_by_key(|r| (!r.status.is_open(), r.id));
    Ok(Json(requests))
}
