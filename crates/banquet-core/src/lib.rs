//! # Banquet Core
//!
//! Core types for the Banquet booking-negotiation orchestration engine:
//! - [`ProcessRecord`] - Persistent state of one negotiation
//! - [`TurnFacts`] - Structured facts extracted from one inbound turn
//! - [`Requirements`] / [`fingerprint`] - Content-hashed room-fit facts
//! - [`RoomCatalog`] - Read-only venue inventory
//! - [`ApprovalRequest`] - Human-in-the-loop sign-off
//! - [`BanquetError`] - Error taxonomy

pub mod approval;
pub mod error;
pub mod facts;
pub mod hash;
pub mod process;
pub mod requirements;
pub mod room;

// Re-exports for convenience
pub use approval::{ApprovalKind, ApprovalRequest, ApprovalStatus, ResumeInstruction};
pub use error::{BanquetError, Result};
pub use facts::{ApprovalDecision, ConflictReply, MessageTopic, TurnFacts, TurnFactsBuilder};
pub use hash::{fingerprint, Fingerprint};
pub use process::{
    AuditEntry, PendingConflict, PendingRoomDecision, ProcessRecord, ResourceStatus, Step,
    ThreadState, TransitionReason,
};
pub use requirements::{EventWindow, Requirements, RequirementsPatch, SeatingLayout};
pub use room::{Bookable, Room, RoomCatalog};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::approval::{ApprovalKind, ApprovalRequest, ApprovalStatus, ResumeInstruction};
    pub use crate::error::{BanquetError, Result};
    pub use crate::facts::{ConflictReply, MessageTopic, TurnFacts};
    pub use crate::hash::fingerprint;
    pub use crate::process::{ProcessRecord, ResourceStatus, Step, ThreadState};
    pub use crate::requirements::{EventWindow, Requirements, SeatingLayout};
    pub use crate::room::{Room, RoomCatalog};
}
