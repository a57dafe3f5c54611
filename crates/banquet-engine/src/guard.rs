//! Guard Engine: per-step precondition evaluator.
//!
//! Called before a step body runs; decides whether execution must instead
//! jump to an earlier step. Pure; callers apply `forced_step` and audit the
//! transition themselves.

use banquet_core::{ProcessRecord, Step, TransitionReason, TurnFacts};
use serde::{Deserialize, Serialize};

/// Which guard fired, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardReason {
    /// No guard fired; execute `current_step`.
    None,
    /// The date is absent or unconfirmed.
    DateUnconfirmed,
    /// No valid room lock for the current requirements.
    RoomInvalid,
    /// No sent offer covers the current requirements.
    OfferStale,
}

impl GuardReason {
    /// The audit reason for a transition forced by this guard.
    pub fn transition_reason(&self) -> Option<TransitionReason> {
        match self {
            GuardReason::None => None,
            GuardReason::DateUnconfirmed => Some(TransitionReason::DateGuard),
            GuardReason::RoomInvalid => Some(TransitionReason::RoomGuard),
            GuardReason::OfferStale => Some(TransitionReason::OfferGuard),
        }
    }
}

/// The Guard Engine's verdict for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardVerdict {
    /// The step that must execute. Equals `current_step` when no guard fired.
    pub forced_step: Step,
    /// Which guard fired.
    pub reason: GuardReason,
}

/// Evaluate the guards in order, each short-circuiting on failure.
///
/// 1. Date guard: no confirmed date forces [`Step::DateNegotiation`].
/// 2. Room guard: missing lock, an explicitly requested different room, a
///    stale evaluation hash, or an unresolved room conflict forces
///    [`Step::RoomSelection`].
/// 3. Offer guard: a valid lock with no offer covering the current
///    requirements forces [`Step::OfferAssembly`].
pub fn evaluate(record: &ProcessRecord, facts: &TurnFacts) -> GuardVerdict {
    if record.chosen_date.is_none() || !record.date_confirmed {
        return GuardVerdict {
            forced_step: Step::DateNegotiation,
            reason: GuardReason::DateUnconfirmed,
        };
    }

    let requested_other_room = match (&facts.requested_room, &record.locked_room_id) {
        (Some(requested), Some(locked)) => requested != locked,
        _ => false,
    };
    let room_settled = record.locked_room_id.is_some()
        && record.lock_is_valid()
        && record.pending_conflict.is_none();
    if !room_settled || requested_other_room {
        return GuardVerdict {
            forced_step: Step::RoomSelection,
            reason: GuardReason::RoomInvalid,
        };
    }

    let offer_covers_current = record.offer_sent_hash.as_deref()
        == Some(record.requirements_hash.as_str());
    if !offer_covers_current {
        return GuardVerdict {
            forced_step: Step::OfferAssembly,
            reason: GuardReason::OfferStale,
        };
    }

    GuardVerdict {
        forced_step: record.current_step,
        reason: GuardReason::None,
    }
}
