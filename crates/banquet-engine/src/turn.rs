//! The turn engine: one inbound fact bundle in, one settled record out.
//!
//! A turn runs change detection, detour routing, fact merging and then the
//! step loop: guard, step body, completion handling, until a step waits on
//! outside input. Every mutation happens on a working copy of the record and
//! is written back into the snapshot in one piece; the caller owns locking
//! and persistence around the snapshot.

use banquet_core::{
    ApprovalDecision, ApprovalKind, ApprovalRequest, BanquetError, ConflictReply, MessageTopic,
    PendingConflict, PendingRoomDecision, ProcessRecord, ResourceStatus, Result,
    ResumeInstruction, RoomCatalog, Step, ThreadState, TransitionReason, TurnFacts,
};
use banquet_state::StoreSnapshot;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability::{self, BookingLedger, RankedRoom, RoomStatus};
use crate::change;
use crate::conflict::{self, ConflictKind};
use crate::detour;
use crate::gate;
use crate::guard;

/// What the engine needs from the outside to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnSignal {
    /// No event date yet.
    NeedDate,
    /// A date is on the table but not explicitly confirmed.
    NeedDateConfirmation { date: NaiveDate },
    /// Rooms cannot be ranked without a headcount.
    NeedHeadcount,
    /// A room was proposed and sits at the approval gate.
    RoomProposalPending { room_id: String, request_id: Uuid },
    /// The wanted room is softly held by others; the client must choose.
    SoftConflict {
        room_id: String,
        date: NaiveDate,
        holders: Vec<Uuid>,
    },
    /// The client insisted on a contested room; a reason is needed before
    /// escalation.
    ConflictReasonNeeded { room_id: String },
    /// No room fits the headcount on any layout.
    CapacityExceeded { headcount: u32 },
    /// Every fitting room is taken on the date.
    NoRoomAvailable { date: NaiveDate },
    /// Halted on a pending human approval.
    WaitingOnApproval { request_id: Uuid },
    /// A proposal was rejected; fresh guidance is needed to retry.
    AwaitingGuidance,
    /// The proposal was rejected this turn.
    ProposalRejected,
    /// The offer is out; waiting for the client's accept or revision.
    AwaitingOfferReply,
    /// The negotiation is archived.
    Archived,
}

/// The observable result of one processed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub process_id: Uuid,
    pub current_step: Step,
    pub thread_state: ThreadState,
    pub signal: TurnSignal,
    /// Room ranking, present when the room step evaluated this turn.
    pub ranked_rooms: Option<Vec<RankedRoom>>,
    /// Approval requests this turn parked at the gate.
    pub approvals_created: Vec<Uuid>,
}

enum StepResult {
    /// The step finished; the process moves on.
    Completed,
    /// The step needs outside input; the turn ends here.
    Wait(TurnSignal),
}

/// Open a fresh negotiation in the snapshot.
pub fn open_process(snapshot: &mut StoreSnapshot) -> Uuid {
    let record = ProcessRecord::new();
    let id = record.id;
    info!(process_id = %id, "process opened");
    snapshot.processes.insert(id, record);
    id
}

/// Process one inbound turn for a process.
///
/// An approval decision riding on the turn is applied first; while an
/// undecided approval is pending, turns report the halt and change nothing.
pub fn process_turn(
    snapshot: &mut StoreSnapshot,
    process_id: Uuid,
    facts: &TurnFacts,
    catalog: &RoomCatalog,
) -> Result<TurnOutcome> {
    let record = snapshot.process(process_id)?;
    if record.is_terminal() {
        return Err(BanquetError::InvalidTransition {
            process_id,
            message: "process is archived".to_string(),
        });
    }

    if let Some(decision) = &facts.approval {
        let outcome = apply_decision(snapshot, decision, catalog)?;
        if !has_material_facts(facts) {
            return Ok(outcome);
        }
        // Guidance rode along with the decision; process it as a turn too.
    } else if record.thread_state == ThreadState::WaitingOnApproval {
        let open = record
            .pending_approvals
            .values()
            .find(|id| {
                snapshot
                    .approvals
                    .get(id)
                    .map_or(false, |r| r.status.is_open())
            })
            .copied();
        if let Some(request_id) = open {
            return Ok(halted_outcome(
                record,
                TurnSignal::WaitingOnApproval { request_id },
            ));
        }
        if !has_material_facts(facts) {
            // A rejected proposal sits here until fresh guidance arrives.
            return Ok(halted_outcome(record, TurnSignal::AwaitingGuidance));
        }
    }

    run_turn(snapshot, process_id, facts, catalog)
}

/// Apply a human approval decision and resume the owning process.
pub fn apply_decision(
    snapshot: &mut StoreSnapshot,
    decision: &ApprovalDecision,
    catalog: &RoomCatalog,
) -> Result<TurnOutcome> {
    let requester = snapshot.approval(decision.request_id)?.process_id;
    let instruction = gate::decide(snapshot, decision)?;
    gate::mark_done(snapshot, decision.request_id)?;

    match instruction {
        ResumeInstruction::CommitRoomLock {
            process_id,
            room_id,
            eval_hash,
        } => {
            let mut record = snapshot.process(process_id)?.clone();
            record.lock_room(room_id, eval_hash);
            record.pending_room_decision = None;
            let step = record.current_step;
            record.append_audit(step, step, TransitionReason::ApprovalApproved);
            record.thread_state = ThreadState::AwaitingClient;
            snapshot.processes.insert(process_id, record);
            run_turn(snapshot, process_id, &TurnFacts::default(), catalog)
        }
        ResumeInstruction::DiscardProposal { process_id } => {
            let record = snapshot
                .processes
                .get_mut(&process_id)
                .ok_or(BanquetError::ProcessNotFound(process_id))?;
            record.pending_room_decision = None;
            record.thread_state = ThreadState::WaitingOnApproval;
            let step = record.current_step;
            record.append_audit(step, step, TransitionReason::ApprovalRejected);
            info!(process_id = %process_id, "room proposal rejected");
            Ok(TurnOutcome {
                process_id,
                current_step: record.current_step,
                thread_state: record.thread_state,
                signal: TurnSignal::ProposalRejected,
                ranked_rooms: None,
                approvals_created: Vec::new(),
            })
        }
        ResumeInstruction::ResolveConflict {
            winner_process_id,
            loser_process_id,
            contested_room_id,
        } => {
            let mut loser = snapshot.process(loser_process_id)?.clone();
            let ledger = BookingLedger::derive(
                snapshot
                    .processes
                    .values()
                    .filter(|p| p.id != loser_process_id),
            );
            conflict::apply_loss(&mut loser, &contested_room_id, catalog, &ledger);
            loser.thread_state = ThreadState::AwaitingClient;
            snapshot.processes.insert(loser_process_id, loser);

            // A winner parked on this very arbitration resumes; a winner that
            // never escalated is left untouched.
            if let Some(winner) = snapshot.processes.get_mut(&winner_process_id) {
                if winner.thread_state == ThreadState::WaitingOnApproval
                    && winner.pending_approvals.is_empty()
                {
                    winner.thread_state = ThreadState::AwaitingClient;
                    winner.pending_conflict = None;
                }
            }

            run_turn(snapshot, requester, &TurnFacts::default(), catalog)
        }
    }
}

/// The turn proper: detect changes, merge facts, run the step loop, write
/// the record back.
fn run_turn(
    snapshot: &mut StoreSnapshot,
    process_id: Uuid,
    facts: &TurnFacts,
    catalog: &RoomCatalog,
) -> Result<TurnOutcome> {
    let mut record = snapshot.process(process_id)?.clone();
    if record.is_terminal() {
        return Err(BanquetError::InvalidTransition {
            process_id,
            message: "process is archived".to_string(),
        });
    }
    record.thread_state = ThreadState::InProgress;

    // Change detection compares facts against the record as it was; merging
    // first would erase the very difference being classified.
    if let Some(kind) = change::classify(&record, facts) {
        let decision = detour::route(&record, kind);
        detour::apply(&mut record, decision, kind);
    }
    merge_facts(&mut record, facts);

    let mut ranked_rooms = None;
    let mut approvals_created = Vec::new();
    let signal = run_until_wait(
        &mut record,
        facts,
        snapshot,
        catalog,
        &mut ranked_rooms,
        &mut approvals_created,
    )?;

    record.thread_state = thread_state_for(&signal);
    let outcome = TurnOutcome {
        process_id,
        current_step: record.current_step,
        thread_state: record.thread_state,
        signal,
        ranked_rooms,
        approvals_created,
    };
    snapshot.processes.insert(process_id, record);
    Ok(outcome)
}

fn merge_facts(record: &mut ProcessRecord, facts: &TurnFacts) {
    if facts.topic != MessageTopic::PaymentAcknowledgment {
        if let Some(date) = facts.event_date {
            if record.chosen_date != Some(date) {
                record.chosen_date = Some(date);
                record.date_confirmed = false;
                // Room exclusions are scoped to the date they were made on.
                record.excluded_rooms.clear();
            }
        }
    }
    if facts.confirms_date && record.chosen_date.is_some() {
        record.date_confirmed = true;
    }
    if record.requirements.merge(&facts.requirements) {
        record.refresh_requirements_hash();
    }
}

fn has_material_facts(facts: &TurnFacts) -> bool {
    facts.event_date.is_some()
        || facts.confirms_date
        || !facts.requirements.is_empty()
        || facts.requested_room.is_some()
        || facts.accepts_offer
        || facts.conflict_reply.is_some()
}

fn thread_state_for(signal: &TurnSignal) -> ThreadState {
    match signal {
        TurnSignal::WaitingOnApproval { .. } | TurnSignal::RoomProposalPending { .. } => {
            ThreadState::WaitingOnApproval
        }
        _ => ThreadState::AwaitingClient,
    }
}

fn halted_outcome(record: &ProcessRecord, signal: TurnSignal) -> TurnOutcome {
    TurnOutcome {
        process_id: record.id,
        current_step: record.current_step,
        thread_state: record.thread_state,
        signal,
        ranked_rooms: None,
        approvals_created: Vec::new(),
    }
}

// A turn touches each step at most a couple of times; anything past this is
// a routing cycle.
const STEP_LOOP_FUEL: u8 = 16;

fn run_until_wait(
    record: &mut ProcessRecord,
    facts: &TurnFacts,
    snapshot: &mut StoreSnapshot,
    catalog: &RoomCatalog,
    ranked_rooms: &mut Option<Vec<RankedRoom>>,
    approvals_created: &mut Vec<Uuid>,
) -> Result<TurnSignal> {
    for _ in 0..STEP_LOOP_FUEL {
        // Guards only ever pull execution backwards; forward motion is the
        // completion path's job.
        let verdict = guard::evaluate(record, facts);
        if verdict.forced_step < record.current_step {
            if let Some(reason) = verdict.reason.transition_reason() {
                record.transition_to(verdict.forced_step, reason);
            }
        }

        match run_step(record, facts, snapshot, catalog, ranked_rooms, approvals_created)? {
            StepResult::Wait(signal) => return Ok(signal),
            StepResult::Completed => {
                if let Some(caller) = record.caller_step {
                    // On the way back to the caller a guard may demand an
                    // intermediate step first; the return address survives.
                    let verdict = guard::evaluate(record, facts);
                    if verdict.forced_step != record.current_step
                        && verdict.forced_step != caller
                    {
                        if let Some(reason) = verdict.reason.transition_reason() {
                            record.transition_to(verdict.forced_step, reason);
                            continue;
                        }
                    }
                    detour::return_to_caller(record);
                    continue;
                }
                match record.current_step.next() {
                    Some(next) => {
                        record.transition_to(next, TransitionReason::StepComplete);
                    }
                    None => return Ok(TurnSignal::Archived),
                }
            }
        }
    }
    Err(BanquetError::Internal(format!(
        "turn for process {} did not settle",
        record.id
    )))
}

fn run_step(
    record: &mut ProcessRecord,
    facts: &TurnFacts,
    snapshot: &mut StoreSnapshot,
    catalog: &RoomCatalog,
    ranked_rooms: &mut Option<Vec<RankedRoom>>,
    approvals_created: &mut Vec<Uuid>,
) -> Result<StepResult> {
    match record.current_step {
        Step::Intake => Ok(StepResult::Completed),
        Step::DateNegotiation => Ok(match record.chosen_date {
            None => StepResult::Wait(TurnSignal::NeedDate),
            Some(date) if !record.date_confirmed => {
                StepResult::Wait(TurnSignal::NeedDateConfirmation { date })
            }
            Some(_) => StepResult::Completed,
        }),
        Step::RoomSelection => {
            run_room_step(record, facts, snapshot, catalog, ranked_rooms, approvals_created)
        }
        Step::OfferAssembly => {
            record.offer_sent_hash = Some(record.requirements_hash.clone());
            record.offer_accepted = false;
            info!(process_id = %record.id, "offer assembled for current requirements");
            Ok(StepResult::Completed)
        }
        Step::OfferNegotiation => {
            if record.offer_accepted {
                return Ok(StepResult::Completed);
            }
            if facts.accepts_offer {
                record.offer_accepted = true;
                info!(process_id = %record.id, "offer accepted");
                return Ok(StepResult::Completed);
            }
            Ok(StepResult::Wait(TurnSignal::AwaitingOfferReply))
        }
        Step::Confirmation => run_confirmation_step(record, snapshot, approvals_created),
        Step::Closeout => {
            if !record.archived {
                record.archived = true;
                let step = record.current_step;
                record.append_audit(step, step, TransitionReason::Archived);
                info!(process_id = %record.id, "process archived");
            }
            Ok(StepResult::Wait(TurnSignal::Archived))
        }
    }
}

fn run_room_step(
    record: &mut ProcessRecord,
    facts: &TurnFacts,
    snapshot: &mut StoreSnapshot,
    catalog: &RoomCatalog,
    ranked_rooms: &mut Option<Vec<RankedRoom>>,
    approvals_created: &mut Vec<Uuid>,
) -> Result<StepResult> {
    let date = record
        .chosen_date
        .ok_or_else(|| BanquetError::MissingPrerequisite {
            step: Step::RoomSelection.index(),
            message: "room selection entered without a chosen date".to_string(),
        })?;

    if record.requirements.headcount == 0 {
        return Ok(StepResult::Wait(TurnSignal::NeedHeadcount));
    }

    let ledger =
        BookingLedger::derive(snapshot.processes.values().filter(|p| p.id != record.id));

    // An outstanding soft-conflict warning; the client's reply drives it.
    if let Some(pending) = record.pending_conflict.clone() {
        match &facts.conflict_reply {
            Some(ConflictReply::SeeAlternatives) => {
                record.clear_room_lock();
                record.pending_room_decision = None;
                record.pending_conflict = None;
                record.excluded_rooms.insert(pending.room_id);
                // Falls through to a fresh evaluation.
            }
            Some(ConflictReply::Insist { reason }) => {
                if reason.is_none() && !pending.reason_requested {
                    if let Some(p) = record.pending_conflict.as_mut() {
                        p.reason_requested = true;
                    }
                    return Ok(StepResult::Wait(TurnSignal::ConflictReasonNeeded {
                        room_id: pending.room_id,
                    }));
                }
                let request = conflict::escalation_request(
                    record,
                    &pending.room_id,
                    pending.date,
                    &pending.holders,
                    reason.as_deref(),
                );
                let request_id = gate::submit_on(record, &mut snapshot.approvals, request)?;
                approvals_created.push(request_id);
                record.pending_conflict = None;
                return Ok(StepResult::Wait(TurnSignal::WaitingOnApproval { request_id }));
            }
            None => {
                return Ok(StepResult::Wait(TurnSignal::SoftConflict {
                    room_id: pending.room_id,
                    date: pending.date,
                    holders: pending.holders,
                }));
            }
        }
    }

    // Fast path after a date move: the lock survived, only its validation
    // hash was cleared. Re-check the same room before re-ranking everything.
    if record.room_eval_hash.is_none() {
        if let Some(room_id) = record.locked_room_id.clone() {
            let status = availability::check_single(
                record.id,
                &room_id,
                date,
                &record.requirements,
                catalog,
                &ledger,
            );
            if status == Some(RoomStatus::Available) {
                let hash = record.requirements_hash.clone();
                record.lock_room(room_id.clone(), hash);
                info!(process_id = %record.id, room = %room_id, %date, "lock re-validated");
                return Ok(StepResult::Completed);
            }
            record.clear_room_lock();
        }
    }

    if record.lock_is_valid() {
        return Ok(StepResult::Completed);
    }

    let eval = availability::evaluate(
        record.id,
        date,
        &record.requirements,
        catalog,
        &ledger,
        &record.excluded_rooms,
    );
    *ranked_rooms = Some(eval.ranked.clone());

    if eval.capacity_exceeded {
        return Ok(StepResult::Wait(TurnSignal::CapacityExceeded {
            headcount: record.requirements.headcount,
        }));
    }

    // An explicitly named room takes precedence over the ranking, as long as
    // it is proposable at all.
    let candidate = facts
        .requested_room
        .as_ref()
        .and_then(|name| {
            eval.ranked.iter().find(|r| {
                r.room_id == *name && r.slack.is_some() && r.status != RoomStatus::Unavailable
            })
        })
        .cloned()
        .or_else(|| eval.proposal.clone());

    let candidate = match candidate {
        Some(c) => c,
        None => return Ok(StepResult::Wait(TurnSignal::NoRoomAvailable { date })),
    };

    match conflict::detect(
        record.id,
        &candidate.room_id,
        date,
        &record.requirements.window,
        &ledger,
        false,
    ) {
        ConflictKind::Soft { holders } => {
            // Take the Option hold immediately so later arrivals see the
            // contention, then warn the client.
            let hash = record.requirements_hash.clone();
            record.lock_room(candidate.room_id.clone(), hash);
            record.pending_conflict = Some(PendingConflict {
                room_id: candidate.room_id.clone(),
                date,
                holders: holders.clone(),
                reason_requested: false,
            });
            warn!(
                process_id = %record.id,
                room = %candidate.room_id,
                holders = holders.len(),
                "proposed room is softly held"
            );
            Ok(StepResult::Wait(TurnSignal::SoftConflict {
                room_id: candidate.room_id,
                date,
                holders,
            }))
        }
        ConflictKind::Hard { holders } => {
            let request =
                conflict::escalation_request(record, &candidate.room_id, date, &holders, None);
            let request_id = gate::submit_on(record, &mut snapshot.approvals, request)?;
            approvals_created.push(request_id);
            Ok(StepResult::Wait(TurnSignal::WaitingOnApproval { request_id }))
        }
        ConflictKind::None => {
            record.pending_room_decision = Some(PendingRoomDecision {
                room_id: candidate.room_id.clone(),
                eval_hash: record.requirements_hash.clone(),
                approval_id: None,
            });
            let request = ApprovalRequest::new(
                record.id,
                Step::RoomSelection,
                ApprovalKind::RoomProposal,
                serde_json::json!({
                    "room_id": candidate.room_id.clone(),
                    "date": date,
                    "headcount": record.requirements.headcount,
                    "matched_features": candidate.matched_features,
                    "missing_features": candidate.missing_features,
                }),
            );
            let request_id = gate::submit_on(record, &mut snapshot.approvals, request)?;
            if let Some(pending) = record.pending_room_decision.as_mut() {
                pending.approval_id = Some(request_id);
            }
            approvals_created.push(request_id);
            Ok(StepResult::Wait(TurnSignal::RoomProposalPending {
                room_id: candidate.room_id,
                request_id,
            }))
        }
    }
}

fn run_confirmation_step(
    record: &mut ProcessRecord,
    snapshot: &mut StoreSnapshot,
    approvals_created: &mut Vec<Uuid>,
) -> Result<StepResult> {
    let (room_id, date) = match (&record.locked_room_id, record.chosen_date) {
        (Some(room), Some(date)) => (room.clone(), date),
        _ => {
            return Err(BanquetError::MissingPrerequisite {
                step: Step::Confirmation.index(),
                message: "confirmation entered without a locked room".to_string(),
            })
        }
    };

    let ledger =
        BookingLedger::derive(snapshot.processes.values().filter(|p| p.id != record.id));
    match conflict::detect(
        record.id,
        &room_id,
        date,
        &record.requirements.window,
        &ledger,
        true,
    ) {
        ConflictKind::None => {
            record.resource_status = ResourceStatus::Confirmed;
            info!(process_id = %record.id, room = %room_id, %date, "hold upgraded to confirmed");
            Ok(StepResult::Completed)
        }
        ConflictKind::Soft { holders } | ConflictKind::Hard { holders } => {
            let request = conflict::escalation_request(record, &room_id, date, &holders, None);
            let request_id = gate::submit_on(record, &mut snapshot.approvals, request)?;
            approvals_created.push(request_id);
            Ok(StepResult::Wait(TurnSignal::WaitingOnApproval { request_id }))
        }
    }
}
