//! Human-approval request types for the Approval Gate.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::process::Step;

/// Lifecycle of an approval request: Pending → Approved/Rejected → Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for a human decision.
    Pending,
    /// Approved; the resume instruction has not been applied yet.
    Approved,
    /// Rejected; the resume instruction has not been applied yet.
    Rejected,
    /// Decision applied to the process record.
    Done,
}

impl ApprovalStatus {
    /// Whether a decision can still be taken.
    pub fn is_open(&self) -> bool {
        matches!(self, ApprovalStatus::Pending)
    }
}

/// What the approval is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// Sign-off on a proposed room lock.
    RoomProposal,
    /// Arbitration of a hard room conflict between two processes.
    RoomConflictResolution,
}

/// A request held at the Approval Gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique identifier of the request.
    pub id: Uuid,

    /// The step whose outcome is held pending this decision.
    pub step: Step,

    /// Lifecycle status.
    pub status: ApprovalStatus,

    /// The process this request belongs to.
    pub process_id: Uuid,

    /// What is being approved.
    pub kind: ApprovalKind,

    /// Kind-specific details: proposed room, contested slot, insisting
    /// reason, competing process ids.
    pub payload: serde_json::Value,
}

impl ApprovalRequest {
    /// Create a new pending request.
    pub fn new(process_id: Uuid, step: Step, kind: ApprovalKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            step,
            status: ApprovalStatus::Pending,
            process_id,
            kind,
            payload,
        }
    }
}

/// What the caller must apply to the process record after a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResumeInstruction {
    /// Commit the pending room lock and continue past room selection.
    CommitRoomLock {
        process_id: Uuid,
        room_id: String,
        eval_hash: String,
    },
    /// Clear the pending proposal and wait for fresh guidance.
    DiscardProposal { process_id: Uuid },
    /// Conflict arbitration: the winner keeps its lock; the loser is
    /// re-routed (room re-selection, or date re-selection when the date is
    /// fully booked).
    ResolveConflict {
        winner_process_id: Uuid,
        loser_process_id: Uuid,
        contested_room_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let req = ApprovalRequest::new(
            Uuid::new_v4(),
            Step::RoomSelection,
            ApprovalKind::RoomProposal,
            serde_json::json!({ "room": "Salon A" }),
        );
        assert_eq!(req.status, ApprovalStatus::Pending);
        assert!(req.status.is_open());
    }

    #[test]
    fn test_done_is_closed() {
        assert!(!ApprovalStatus::Done.is_open());
        assert!(!ApprovalStatus::Approved.is_open());
    }

    #[test]
    fn test_resume_instruction_serialization() {
        let instr = ResumeInstruction::DiscardProposal {
            process_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&instr).unwrap();
        assert!(json.contains("discard_proposal"));
    }
}
