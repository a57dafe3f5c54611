//! Process endpoints: open a negotiation, feed it turns, inspect it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use banquet_core::{
    ProcessRecord, ResourceStatus, Step, ThreadState, TurnFacts,
};
use banquet_engine::{open_process, process_turn, TurnOutcome};
use banquet_state::AuditExport;
use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::status_for;
use crate::state::AppState;

/// Response after opening a negotiation.
#[derive(Debug, Serialize)]
pub struct OpenProcessResponse {
    pub id: Uuid,
    pub current_step: u8,
}

/// Summary view of one process record.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub id: Uuid,
    pub current_step: u8,
    pub caller_step: Option<u8>,
    pub thread_state: ThreadState,
    pub chosen_date: Option<NaiveDate>,
    pub date_confirmed: bool,
    pub locked_room_id: Option<String>,
    pub resource_status: ResourceStatus,
    pub offer_accepted: bool,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&ProcessRecord> for ProcessResponse {
    fn from(record: &ProcessRecord) -> Self {
        Self {
            id: record.id,
            current_step: record.current_step.index(),
            caller_step: record.caller_step.map(|s| s.index()),
            thread_state: record.thread_state,
            chosen_date: record.chosen_date,
            date_confirmed: record.date_confirmed,
            locked_room_id: record.locked_room_id.clone(),
            resource_status: record.resource_status,
            offer_accepted: record.offer_accepted,
            archived: record.archived,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Open a new negotiation.
pub async fn open(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<OpenProcessResponse>), (StatusCode, String)> {
    let id = state
        .with_snapshot(|snapshot| Ok(open_process(snapshot)))
        .await
        .map_err(status_for)?;

    Ok((
        StatusCode::CREATED,
        Json(OpenProcessResponse {
            id,
            current_step: Step::Intake.index(),
        }),
    ))
}

/// Feed one structured-facts turn into a negotiation.
pub async fn turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(facts): Json<TurnFacts>,
) -> Result<Json<TurnOutcome>, (StatusCode, String)> {
    let outcome = state
        .with_snapshot(|snapshot| process_turn(snapshot, id, &facts, &state.catalog))
        .await
        .map_err(status_for)?;
    Ok(Json(outcome))
}

/// Get the current state of a negotiation.
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProcessResponse>, (StatusCode, String)> {
    let snapshot = state.read_snapshot().await.map_err(status_for)?;
    let record = snapshot.process(id).map_err(status_for)?;
    Ok(Json(ProcessResponse::from(record)))
}

/// Export a negotiation's audit trail.
pub async fn audit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AuditExport>, (StatusCode, String)> {
    let snapshot = state.read_snapshot().await.map_err(status_for)?;
    let record = snapshot.process(id).map_err(status_for)?;
    Ok(Json(AuditExport::from_record(record)))
}
