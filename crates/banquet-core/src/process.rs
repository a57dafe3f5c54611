//! The Process Record: persistent state of one booking negotiation.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::{fingerprint, Fingerprint};
use crate::requirements::Requirements;

/// The seven ordered process steps of a booking negotiation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// First contact; the record is opened here.
    Intake,
    /// Gather and explicitly confirm the event date.
    DateNegotiation,
    /// Evaluate, propose and lock a room.
    RoomSelection,
    /// Produce the offer for the current requirements.
    OfferAssembly,
    /// Client accepts or revises the offer.
    OfferNegotiation,
    /// Upgrade the room hold from Option to Confirmed.
    Confirmation,
    /// Archive; terminal.
    Closeout,
}

impl Step {
    /// Stable 1-based index of the step.
    pub fn index(&self) -> u8 {
        match self {
            Step::Intake => 1,
            Step::DateNegotiation => 2,
            Step::RoomSelection => 3,
            Step::OfferAssembly => 4,
            Step::OfferNegotiation => 5,
            Step::Confirmation => 6,
            Step::Closeout => 7,
        }
    }

    /// Step for a 1-based index.
    pub fn from_index(index: u8) -> Option<Step> {
        match index {
            1 => Some(Step::Intake),
            2 => Some(Step::DateNegotiation),
            3 => Some(Step::RoomSelection),
            4 => Some(Step::OfferAssembly),
            5 => Some(Step::OfferNegotiation),
            6 => Some(Step::Confirmation),
            7 => Some(Step::Closeout),
            _ => None,
        }
    }

    /// The step after this one, if any.
    pub fn next(&self) -> Option<Step> {
        Step::from_index(self.index() + 1)
    }
}

/// Whose move it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    /// Waiting for the client's next message.
    #[default]
    AwaitingClient,
    /// Waiting for the venue manager's input.
    AwaitingManager,
    /// Halted on a pending human approval.
    WaitingOnApproval,
    /// A turn is being processed right now.
    InProgress,
}

/// Commitment strength of the locked room on the chosen date.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// No claim yet; the process is still qualifying.
    #[default]
    Lead,
    /// Soft, non-binding hold. Any number may coexist on a slot.
    Option,
    /// Binding hold. At most one per room and overlapping window.
    Confirmed,
    /// The process released or lost its claim.
    Cancelled,
}

/// Why a transition was taken; closed so tests can assert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    Created,
    DateGuard,
    RoomGuard,
    OfferGuard,
    DateChange,
    RoomChange,
    RequirementsChange,
    ReturnToCaller,
    StepComplete,
    ApprovalApproved,
    ApprovalRejected,
    ConflictLoss,
    Archived,
}

/// One audited transition. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub from_step: Step,
    pub to_step: Step,
    pub reason: TransitionReason,
    pub at: DateTime<Utc>,
}

/// A proposed room plus the hash it was evaluated against, awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRoomDecision {
    /// The room being proposed.
    pub room_id: String,
    /// Requirements fingerprint at evaluation time.
    pub eval_hash: Fingerprint,
    /// The approval request gating the proposal, once submitted.
    pub approval_id: Option<Uuid>,
}

/// An unresolved soft conflict awaiting the client's choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConflict {
    /// The contested room.
    pub room_id: String,
    /// The contested date.
    pub date: NaiveDate,
    /// Processes holding an overlapping Option on that slot.
    pub holders: Vec<Uuid>,
    /// The client insisted without a reason and has been asked once for it.
    #[serde(default)]
    pub reason_requested: bool,
}

/// The persistent state of one booking negotiation.
///
/// Owned exclusively by the orchestration core; mutated only through the
/// engine's operations; never deleted, only archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Unique identifier of this negotiation.
    pub id: Uuid,

    /// The step the engine must execute next. The only authoritative
    /// pointer to "what runs next".
    pub current_step: Step,

    /// Return address for a detour, at most one level deep.
    pub caller_step: Option<Step>,

    /// Whose move it is.
    pub thread_state: ThreadState,

    /// Facts materially affecting room fit.
    pub requirements: Requirements,

    /// Fingerprint of `requirements` as of its last change.
    pub requirements_hash: Fingerprint,

    /// The negotiated event date.
    pub chosen_date: Option<NaiveDate>,

    /// Whether the client has explicitly confirmed `chosen_date`.
    pub date_confirmed: bool,

    /// The room committed to this process. Set and cleared together with
    /// `room_eval_hash`, atomically.
    pub locked_room_id: Option<String>,

    /// Fingerprint of `requirements` at the time `locked_room_id` was last
    /// validated.
    pub room_eval_hash: Option<Fingerprint>,

    /// When the current lock was first taken; first-come-first-served
    /// tiebreak in conflict arbitration.
    pub lock_taken_at: Option<DateTime<Utc>>,

    /// A proposed room awaiting approval.
    pub pending_room_decision: Option<PendingRoomDecision>,

    /// An unresolved soft conflict awaiting the client's choice.
    pub pending_conflict: Option<PendingConflict>,

    /// Commitment strength of `locked_room_id` on `chosen_date`.
    pub resource_status: ResourceStatus,

    /// Outstanding approval request ids, keyed by step.
    pub pending_approvals: std::collections::BTreeMap<u8, Uuid>,

    /// Fingerprint the last sent offer covers, if one was produced.
    pub offer_sent_hash: Option<Fingerprint>,

    /// Whether the client accepted the outstanding offer.
    pub offer_accepted: bool,

    /// Rooms this process must not be offered (conflict losses,
    /// see-alternatives choices).
    pub excluded_rooms: BTreeSet<String>,

    /// Append-only transition history. The only place history lives.
    pub audit: Vec<AuditEntry>,

    /// Terminal: the record is archived and no longer mutated.
    pub archived: bool,

    /// Timestamp when the record was created.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last mutation.
    pub updated_at: DateTime<Utc>,
}

impl ProcessRecord {
    /// Open a new negotiation. Appends the creation transition.
    pub fn new() -> Self {
        let now = Utc::now();
        let requirements = Requirements::default();
        let requirements_hash = fingerprint(&requirements);

        let mut record = Self {
            id: Uuid::new_v4(),
            current_step: Step::Intake,
            caller_step: None,
            thread_state: ThreadState::AwaitingClient,
            requirements,
            requirements_hash,
            chosen_date: None,
            date_confirmed: false,
            locked_room_id: None,
            room_eval_hash: None,
            lock_taken_at: None,
            pending_room_decision: None,
            pending_conflict: None,
            resource_status: ResourceStatus::Lead,
            pending_approvals: std::collections::BTreeMap::new(),
            offer_sent_hash: None,
            offer_accepted: false,
            excluded_rooms: BTreeSet::new(),
            audit: Vec::new(),
            archived: false,
            created_at: now,
            updated_at: now,
        };
        record.append_audit(Step::Intake, Step::Intake, TransitionReason::Created);
        record
    }

    /// Append a transition to the audit log and touch `updated_at`.
    pub fn append_audit(&mut self, from: Step, to: Step, reason: TransitionReason) {
        self.audit.push(AuditEntry {
            from_step: from,
            to_step: to,
            reason,
            at: Utc::now(),
        });
        self.updated_at = Utc::now();
    }

    /// Move to a step and audit the transition.
    pub fn transition_to(&mut self, step: Step, reason: TransitionReason) {
        let from = self.current_step;
        self.current_step = step;
        if self.caller_step == Some(step) {
            self.caller_step = None;
        }
        self.append_audit(from, step, reason);
    }

    /// Commit a room lock: sets `locked_room_id` and `room_eval_hash`
    /// together, as the invariant requires.
    pub fn lock_room(&mut self, room_id: impl Into<String>, eval_hash: Fingerprint) {
        self.locked_room_id = Some(room_id.into());
        self.room_eval_hash = Some(eval_hash);
        if self.lock_taken_at.is_none() {
            self.lock_taken_at = Some(Utc::now());
        }
        if self.resource_status < ResourceStatus::Option {
            self.resource_status = ResourceStatus::Option;
        }
        self.updated_at = Utc::now();
    }

    /// Clear the room lock pair atomically.
    pub fn clear_room_lock(&mut self) {
        self.locked_room_id = None;
        self.room_eval_hash = None;
        self.lock_taken_at = None;
        if self.resource_status == ResourceStatus::Option {
            self.resource_status = ResourceStatus::Lead;
        }
        self.updated_at = Utc::now();
    }

    /// Whether the cached lock is still valid for the current requirements.
    pub fn lock_is_valid(&self) -> bool {
        self.locked_room_id.is_some()
            && self.room_eval_hash.as_deref() == Some(self.requirements_hash.as_str())
    }

    /// Recompute `requirements_hash` after a requirements mutation.
    pub fn refresh_requirements_hash(&mut self) {
        self.requirements_hash = fingerprint(&self.requirements);
        self.updated_at = Utc::now();
    }

    /// Whether the negotiation reached a terminal confirmed/cancelled state.
    pub fn is_terminal(&self) -> bool {
        self.archived
            || (self.current_step == Step::Closeout
                && matches!(
                    self.resource_status,
                    ResourceStatus::Confirmed | ResourceStatus::Cancelled
                ))
    }
}

impl Default for ProcessRecord {
    fn default() -> Self {
        Self::new()
    }
}
