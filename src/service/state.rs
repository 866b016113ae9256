//! Shared service state.

use std::sync::Arc;

use crate::assembler::ThreadAssembler;
use crate::config::StorageKind;
use crate::store::{ContentStore, InMemoryContentStore};

/// Shared service state.
///
/// Holds the assembler over whichever backend was selected at startup.
/// Handlers depend only on `dyn ContentStore`.
#[derive(Clone)]
pub struct ServiceState {
    /// Tree assembler over the selected store.
    pub assembler: ThreadAssembler<dyn ContentStore>,
    /// Backend selected at startup, reported by the health endpoint.
    pub storage: StorageKind,
}

impl ServiceState {
    /// Create state over an already-initialized store.
    pub fn new(store: Arc<dyn ContentStore>, storage: StorageKind) -> Self {
        Self {
            assembler: ThreadAssembler::new(store),
            storage,
        }
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryContentStore::new()), StorageKind::Memory)
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ContentStore> {
        self.assembler.store()
    }
}
