//! Process store implementations.
//!
//! The orchestration core is pure: every operation takes a [`StoreSnapshot`]
//! and mutates it in memory. The store only loads and saves whole snapshots;
//! the locking discipline (one turn at a time across the whole store) belongs
//! to the caller, which keeps the business logic trivially testable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use banquet_core::{ApprovalRequest, BanquetError, ProcessRecord, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// An immutable-in-spirit snapshot of the shared store: every process record
/// and every approval request. One turn is one load-mutate-save cycle over
/// this value; an abandoned snapshot commits nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// All process records, keyed by process id.
    pub processes: HashMap<Uuid, ProcessRecord>,

    /// All approval requests, keyed by request id.
    pub approvals: HashMap<Uuid, ApprovalRequest>,

    /// Version of the store this snapshot was loaded at.
    pub version: u64,
}

impl StoreSnapshot {
    /// Fetch a process record or fail with `ProcessNotFound`.
    pub fn process(&self, id: Uuid) -> Result<&ProcessRecord> {
        self.processes.get(&id).ok_or(BanquetError::ProcessNotFound(id))
    }

    /// Fetch an approval request or fail with `ApprovalNotFound`.
    pub fn approval(&self, id: Uuid) -> Result<&ApprovalRequest> {
        self.approvals.get(&id).ok_or(BanquetError::ApprovalNotFound(id))
    }
}

/// Trait for process stores.
#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Load the current snapshot.
    async fn load(&self) -> Result<StoreSnapshot>;

    /// Replace the store contents with the given snapshot.
    ///
    /// Fails if the store moved on since the snapshot was loaded, so a
    /// caller that forgot to serialize turns cannot silently lose writes.
    async fn save(&self, snapshot: StoreSnapshot) -> Result<u64>;

    /// Current store version.
    async fn version(&self) -> u64;
}

/// In-memory implementation of [`ProcessStore`].
pub struct InMemoryProcessStore {
    inner: Arc<RwLock<StoreSnapshot>>,
}

impl InMemoryProcessStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreSnapshot::default())),
        }
    }
}

impl Default for InMemoryProcessStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn load(&self) -> Result<StoreSnapshot> {
        let inner = self.inner.read().await;
        Ok(inner.clone())
    }

    async fn save(&self, mut snapshot: StoreSnapshot) -> Result<u64> {
        let mut inner = self.inner.write().await;

        if snapshot.version != inner.version {
            return Err(BanquetError::StoreError {
                message: format!(
                    "stale snapshot: loaded at version {}, store is at {}",
                    snapshot.version, inner.version
                ),
            });
        }

        snapshot.version += 1;
        let version = snapshot.version;
        *inner = snapshot;

        tracing::debug!(version, "store snapshot committed");
        Ok(version)
    }

    async fn version(&self) -> u64 {
        self.inner.read().await.version
    }
}
