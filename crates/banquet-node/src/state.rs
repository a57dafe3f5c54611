//! Shared application state.

use std::sync::Arc;

use banquet_core::{Result, RoomCatalog};
use banquet_state::{InMemoryProcessStore, ProcessStore, StoreSnapshot};
use tokio::sync::Mutex;

/// Shared application state: the process store, the read-only room catalog
/// and the store-wide turn lock.
#[derive(Clone)]
pub struct AppState {
    /// The process store.
    pub store: Arc<InMemoryProcessStore>,

    /// The venue's room inventory, loaded at startup.
    pub catalog: Arc<RoomCatalog>,

    /// Serializes turns across the whole store. The store's versioned save
    /// rejects interleaved writes; this lock keeps them from racing at all.
    turn_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Create fresh state around an empty store.
    pub fn new(catalog: RoomCatalog) -> Self {
        Self {
            store: Arc::new(InMemoryProcessStore::new()),
            catalog: Arc::new(catalog),
            turn_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run one load-mutate-save cycle under the turn lock. A failing
    /// operation abandons its snapshot and commits nothing.
    pub async fn with_snapshot<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<T>,
    {
        let _guard = self.turn_lock.lock().await;
        let mut snapshot = self.store.load().await?;
        let value = op(&mut snapshot)?;
        self.store.save(snapshot).await?;
        Ok(value)
    }

    /// Read-only view of the current snapshot.
    pub async fn read_snapshot(&self) -> Result<StoreSnapshot> {
        self.store.load().await
    }
}
