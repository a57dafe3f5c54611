//! Detour Router: forced jumps to an earlier step with a return address.
//!
//! The `caller_step` slot is a depth-1 return address, not a stack. A second
//! detour while one is pending overwrites the slot only when its target step
//! differs; re-routing into the step already being detoured through keeps
//! the original return address.

use banquet_core::{ProcessRecord, Step, TransitionReason};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::change::ChangeKind;

/// Where a change sends the process, and how to come back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// The step to jump to.
    pub target_step: Step,
    /// Return address; `None` when already at the target.
    pub new_caller_step: Option<Step>,
    /// Whether the room evaluation must be redone at the target.
    pub reeval_required: bool,
}

/// Decide the detour for a classified change. Pure; apply with [`apply`].
pub fn route(record: &ProcessRecord, change: ChangeKind) -> RouteDecision {
    let target_step = match change {
        ChangeKind::DateChange => Step::DateNegotiation,
        ChangeKind::RoomChange | ChangeKind::RequirementsChange => Step::RoomSelection,
    };

    let new_caller_step = if record.current_step == target_step {
        None
    } else {
        Some(record.current_step)
    };

    RouteDecision {
        target_step,
        new_caller_step,
        reeval_required: true,
    }
}

/// Apply a route decision to the record: jump, set the return address, and
/// invalidate whatever the change made untrustworthy.
pub fn apply(record: &mut ProcessRecord, decision: RouteDecision, change: ChangeKind) {
    match change {
        ChangeKind::DateChange => {
            // The room must be re-validated against the new date, but the
            // lock itself survives so the fast path can re-confirm the same
            // room without a full re-ranking. Exclusions were scoped to the
            // old date and do not carry over.
            record.date_confirmed = false;
            record.room_eval_hash = None;
            record.excluded_rooms.clear();
        }
        ChangeKind::RoomChange | ChangeKind::RequirementsChange => {
            record.clear_room_lock();
            record.pending_room_decision = None;
        }
    }
    // A classified change supersedes an open conflict dialogue; whatever
    // slot it warned about is no longer the one being requested.
    record.pending_conflict = None;

    if record.current_step != decision.target_step {
        if let Some(caller) = decision.new_caller_step {
            record.caller_step = Some(caller);
        }
        let from = record.current_step;
        record.current_step = decision.target_step;
        record.append_audit(from, decision.target_step, change.transition_reason());

        info!(
            process_id = %record.id,
            from = from.index(),
            to = decision.target_step.index(),
            change = ?change,
            "detour"
        );
    }
    // Already at the target: keep any pending caller untouched.
}

/// Resume at the interrupted step after a detour's target succeeded.
pub fn return_to_caller(record: &mut ProcessRecord) -> Option<Step> {
    let caller = record.caller_step.take()?;
    record.transition_to(caller, TransitionReason::ReturnToCaller);
    info!(process_id = %record.id, to = caller.index(), "return to caller");
    Some(caller)
}
