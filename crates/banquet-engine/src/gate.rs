//! Approval Gate: holds a step's outcome pending a human decision.
//!
//! `submit` parks a Pending request and halts the owning step; `decide`
//! turns the human's verdict into a [`ResumeInstruction`] the turn engine
//! applies. Exactly one request may be Pending per step per process.

use std::collections::HashMap;

use banquet_core::{
    ApprovalDecision, ApprovalKind, ApprovalRequest, ApprovalStatus, BanquetError, ProcessRecord,
    ResumeInstruction, Result, ThreadState,
};
use banquet_state::StoreSnapshot;
use tracing::info;
use uuid::Uuid;

/// Park a request at the gate. Sets the owning process to
/// `WaitingOnApproval` and records the pending id on its record.
///
/// Submitting a second request for the same step while one is Pending is a
/// caller error.
pub fn submit(snapshot: &mut StoreSnapshot, request: ApprovalRequest) -> Result<Uuid> {
    let record = snapshot
        .processes
        .get_mut(&request.process_id)
        .ok_or(BanquetError::ProcessNotFound(request.process_id))?;
    submit_on(record, &mut snapshot.approvals, request)
}

/// [`submit`] against a working copy of the record, for callers mid-turn
/// that have not written their record back into the snapshot yet.
pub fn submit_on(
    record: &mut ProcessRecord,
    approvals: &mut HashMap<Uuid, ApprovalRequest>,
    request: ApprovalRequest,
) -> Result<Uuid> {
    let step_key = request.step.index();
    if let Some(existing) = record.pending_approvals.get(&step_key) {
        let still_open = approvals.get(existing).map_or(false, |r| r.status.is_open());
        if still_open {
            return Err(BanquetError::InvalidTransition {
                process_id: request.process_id,
                message: format!(
                    "approval already pending for step {} (request {})",
                    step_key, existing
                ),
            });
        }
    }

    let id = request.id;
    record.pending_approvals.insert(step_key, id);
    record.thread_state = ThreadState::WaitingOnApproval;

    info!(
        process_id = %request.process_id,
        request_id = %id,
        kind = ?request.kind,
        step = step_key,
        "approval requested"
    );
    approvals.insert(id, request);
    Ok(id)
}

/// Record the human's verdict and produce the instruction to apply.
///
/// Only Pending requests can be decided; anything else is an invalid
/// transition. The request moves to Approved/Rejected here and to Done once
/// the instruction has been applied.
pub fn decide(
    snapshot: &mut StoreSnapshot,
    decision: &ApprovalDecision,
) -> Result<ResumeInstruction> {
    let request = {
        let request = snapshot
            .approvals
            .get_mut(&decision.request_id)
            .ok_or(BanquetError::ApprovalNotFound(decision.request_id))?;

        if !request.status.is_open() {
            return Err(BanquetError::InvalidTransition {
                process_id: request.process_id,
                message: format!(
                    "approval {} is {:?}, not pending",
                    request.id, request.status
                ),
            });
        }

        request.status = if decision.approved {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Rejected
        };
        request.clone()
    };

    info!(
        request_id = %request.id,
        process_id = %request.process_id,
        approved = decision.approved,
        notes = decision.notes.as_deref().unwrap_or(""),
        "approval decided"
    );

    let instruction = match request.kind {
        ApprovalKind::RoomProposal => {
            if decision.approved {
                let record = snapshot.process(request.process_id)?;
                let pending = record.pending_room_decision.as_ref().ok_or_else(|| {
                    BanquetError::Internal(format!(
                        "approved room proposal {} has no pending decision on process {}",
                        decision.request_id, request.process_id
                    ))
                })?;
                ResumeInstruction::CommitRoomLock {
                    process_id: request.process_id,
                    room_id: pending.room_id.clone(),
                    eval_hash: pending.eval_hash.clone(),
                }
            } else {
                ResumeInstruction::DiscardProposal {
                    process_id: request.process_id,
                }
            }
        }
        ApprovalKind::RoomConflictResolution => {
            let requesting = request.process_id;
            let contested_room_id = request.payload["room_id"]
                .as_str()
                .ok_or_else(|| {
                    BanquetError::Internal(format!(
                        "conflict request {} carries no room id",
                        request.id
                    ))
                })?
                .to_string();
            let first_holder = request.payload["holder_process_ids"][0]
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok());

            // An explicit winner overrides; otherwise first-come-first-served:
            // the earlier holder wins, and a rejected insist means the
            // requester loses.
            let winner = match (decision.approved, decision.winner_process_id) {
                (_, Some(explicit)) => explicit,
                (true, None) => requesting,
                (false, None) => first_holder.unwrap_or(requesting),
            };
            let loser = if winner == requesting {
                first_holder.unwrap_or(requesting)
            } else {
                requesting
            };

            ResumeInstruction::ResolveConflict {
                winner_process_id: winner,
                loser_process_id: loser,
                contested_room_id,
            }
        }
    };

    Ok(instruction)
}

/// Close out a decided request once its instruction has been applied.
pub fn mark_done(snapshot: &mut StoreSnapshot, request_id: Uuid) -> Result<()> {
    let process_id = {
        let request = snapshot
            .approvals
            .get_mut(&request_id)
            .ok_or(BanquetError::ApprovalNotFound(request_id))?;
        request.status = ApprovalStatus::Done;
        request.process_id
    };

    if let Some(record) = snapshot.processes.get_mut(&process_id) {
        record.pending_approvals.retain(|_, id| *id != request_id);
    }
    Ok(())
}
