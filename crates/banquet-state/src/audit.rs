//! Read-only audit export and replay verification.
//!
//! The audit log is the only place transition history lives. `current_step`
//! and `caller_step` stay plain fields written atomically alongside each
//! append; the fold here exists as a debugging check, not as the live source
//! of truth.

use banquet_core::{AuditEntry, ProcessRecord, Step};
use serde::Serialize;
use uuid::Uuid;

/// The audit trail of one process, as handed to observability tooling.
#[derive(Debug, Clone, Serialize)]
pub struct AuditExport {
    /// The process this trail belongs to.
    pub process_id: Uuid,
    /// Transitions, oldest first.
    pub entries: Vec<AuditEntry>,
}

impl AuditExport {
    /// Snapshot a record's audit trail.
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            process_id: record.id,
            entries: record.audit.clone(),
        }
    }
}

/// Fold the audit log down to the step it ends on.
///
/// For a consistent record this equals `current_step`; a mismatch means a
/// transition was applied without its append.
pub fn replay_step(entries: &[AuditEntry]) -> Option<Step> {
    entries.last().map(|e| e.to_step)
}

/// Whether the record's head state agrees with its own audit trail.
pub fn is_consistent(record: &ProcessRecord) -> bool {
    replay_step(&record.audit) == Some(record.current_step)
}
