//! The orchestration engine for venue booking negotiations.
//!
//! One call to [`turn::process_turn`] consumes a structured fact bundle and
//! drives the seven-step state machine until it needs outside input again:
//! guards pull execution back to unsatisfied prerequisites, the change
//! detector and detour router handle mid-flow revisions, and the approval
//! gate parks outcomes on human decisions.

pub mod availability;
pub mod change;
pub mod conflict;
pub mod detour;
pub mod gate;
pub mod guard;
pub mod turn;

pub use availability::{BookingLedger, RankedRoom, RoomEvaluation, RoomStatus};
pub use change::ChangeKind;
pub use conflict::{ConflictKind, LoserRoute};
pub use detour::RouteDecision;
pub use guard::{GuardReason, GuardVerdict};
pub use turn::{apply_decision, open_process, process_turn, TurnOutcome, TurnSignal};
