use std::collections::HashMap;
use std::sync::Mutex;

use crate::store::{ClusterStore, SavedClusterState, SessionKey, StoreError};

/// Process-local store, handy for previews and tests.
#[derive(Default)]
pub struct MemoryStore {
    states: Mutex<HashMap<String, SavedClusterState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.states.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl ClusterStore for MemoryStore {
    fn load(&self, session_id: &str) -> Result<Option<SavedClusterState>, StoreError> {
        let key = SessionKey::sanitize(session_id)?;
        let states = self.states.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(states.get(&key).cloned())
    }

    fn save(&self, session_id: &str, state: &SavedClusterState) -> Result<(), StoreError> {
        let key = SessionKey::sanitize(session_id)?;
        let mut states = self.states.lock().map_err(|_| StoreError::LockPoisoned)?;
        states.insert(key, state.clone());
        Ok(())
    }
}
