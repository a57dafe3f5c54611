//! Conflict Detector/Resolver: arbitration over a room+date+window slot
//! wanted by more than one process.
//!
//! Detection classifies severity; soft conflicts coexist and are talked
//! through with the client; hard conflicts always go to a human. The
//! resolver never auto-decides a hard conflict.

use std::collections::BTreeSet;

use banquet_core::{
    ApprovalKind, ApprovalRequest, EventWindow, ProcessRecord, Requirements, ResourceStatus,
    RoomCatalog, Step, TransitionReason,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability::{self, BookingLedger};

/// Severity of a detected conflict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConflictKind {
    /// Nobody else wants the slot.
    None,
    /// Other processes hold Option on an overlapping window; tolerated.
    Soft { holders: Vec<Uuid> },
    /// A Confirmed holder blocks the slot, or an Option-to-Confirmed upgrade
    /// is attempted while others still hold Option.
    Hard { holders: Vec<Uuid> },
}

/// Classify what the requesting process would run into on the slot.
///
/// `upgrading` marks an attempt to move to Confirmed; a contested Option is
/// a hard conflict then, soft otherwise.
pub fn detect(
    requesting: Uuid,
    room_id: &str,
    date: NaiveDate,
    window: &EventWindow,
    ledger: &BookingLedger,
    upgrading: bool,
) -> ConflictKind {
    let competing = ledger.competing_holds(requesting, room_id, date, window);
    if competing.is_empty() {
        return ConflictKind::None;
    }

    let confirmed: Vec<Uuid> = competing
        .iter()
        .filter(|h| h.status == ResourceStatus::Confirmed)
        .map(|h| h.process_id)
        .collect();
    if !confirmed.is_empty() {
        return ConflictKind::Hard { holders: confirmed };
    }

    let holders: Vec<Uuid> = competing.iter().map(|h| h.process_id).collect();
    if upgrading {
        ConflictKind::Hard { holders }
    } else {
        ConflictKind::Soft { holders }
    }
}

/// Build the `room_conflict_resolution` approval request for an escalated
/// conflict. The caller submits it through the Approval Gate.
pub fn escalation_request(
    record: &ProcessRecord,
    room_id: &str,
    date: NaiveDate,
    holders: &[Uuid],
    insisting_reason: Option<&str>,
) -> ApprovalRequest {
    warn!(
        process_id = %record.id,
        room = room_id,
        %date,
        "hard conflict escalated to approval"
    );
    ApprovalRequest::new(
        record.id,
        record.current_step,
        ApprovalKind::RoomConflictResolution,
        serde_json::json!({
            "requesting_process_id": record.id,
            "holder_process_ids": holders,
            "room_id": room_id,
            "date": date,
            "insisting_reason": insisting_reason,
        }),
    )
}

/// Where the losing process was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoserRoute {
    /// Other rooms exist on the date: re-select a room, contested room
    /// excluded.
    RoomReselection,
    /// The date is fully booked: re-negotiate the date.
    DateReselection,
}

/// Apply a human's arbitration to the losing process.
///
/// The winner keeps its lock unchanged. The loser gives up the contested
/// room; whether it goes back to room selection or all the way to date
/// selection depends on what is still free on its date.
pub fn apply_loss(
    loser: &mut ProcessRecord,
    contested_room_id: &str,
    catalog: &RoomCatalog,
    ledger: &BookingLedger,
) -> LoserRoute {
    loser.clear_room_lock();
    loser.pending_conflict = None;
    loser.pending_room_decision = None;
    loser.excluded_rooms.insert(contested_room_id.to_string());

    let route = match loser.chosen_date {
        Some(date) if has_alternative(loser.id, date, &loser.requirements, catalog, ledger, &loser.excluded_rooms) => {
            LoserRoute::RoomReselection
        }
        _ => LoserRoute::DateReselection,
    };

    match route {
        LoserRoute::RoomReselection => {
            loser.transition_to(Step::RoomSelection, TransitionReason::ConflictLoss);
        }
        LoserRoute::DateReselection => {
            loser.date_confirmed = false;
            loser.transition_to(Step::DateNegotiation, TransitionReason::ConflictLoss);
        }
    }

    info!(loser_process_id = %loser.id, room = contested_room_id, ?route, "conflict loss applied");
    route
}

/// Whether any proposable room remains for the loser on its date, with the
/// contested room already excluded.
fn has_alternative(
    process_id: Uuid,
    date: NaiveDate,
    reqs: &Requirements,
    catalog: &RoomCatalog,
    ledger: &BookingLedger,
    excluded: &BTreeSet<String>,
) -> bool {
    availability::evaluate(process_id, date, reqs, catalog, ledger, excluded)
        .proposal
        .is_some()
}
