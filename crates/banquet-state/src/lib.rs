//! # Banquet State
//!
//! Snapshot-based process store for the Banquet orchestration core, plus the
//! read-only audit export. All business logic operates on [`StoreSnapshot`]
//! values; this crate owns loading and saving them.

pub mod audit;
pub mod store;

pub use audit::{is_consistent, replay_step, AuditExport};
pub use store::{InMemoryProcessStore, ProcessStore, StoreSnapshot};
