use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ResultStore, StoreError};
use crate::screening::domain::SessionId;

type Sessions = HashMap<SessionId, HashMap<String, String>>;

/// Process-lifetime store; each session gets its own key space.
#[derive(Debug, Default, Clone)]
pub struct InMemoryResultStore {
    sessions: Arc<Mutex<Sessions>>,
}

impl InMemoryResultStore {
    fn lock(&self) -> Result<MutexGuard<'_, Sessions>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Unavailable("in-memory store mutex poisoned".to_string()))
    }

    /// Number of keys currently held for a session.
    pub fn len(&self, session: &SessionId) -> Result<usize, StoreError> {
        Ok(self.lock()?.get(session).map_or(0, HashMap::len))
    }
}

impl ResultStore for InMemoryResultStore {
    fn put(&self, session: &SessionId, key: &str, value: String) -> Result<(), StoreError> {
        self.lock()?
            .entry(session.clone())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .lock()?
            .get(session)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StoreError> {
        if let Some(entries) = self.lock()?.get_mut(session) {
            entries.remove(key);
        }
        Ok(())
    }

    fn clear(&self, session: &SessionId, keys: &[&str]) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if let Some(entries) = guard.get_mut(session) {
            for key in keys {
                entries.remove(*key);
            }
            if entries.is_empty() {
                guard.remove(session);
            }
        }
        Ok(())
    }
}
