use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{ResultStore, StoreError};
use crate::screening::domain::SessionId;

type Document = BTreeMap<SessionId, BTreeMap<String, String>>;

/// Store persisted as one JSON document, rewritten after every change.
///
/// Lets a CLI run pick up where a previous run stopped, the way a reloaded
/// page finds its session storage intact.
///
/// File I/O is synchronous and runs on the calling thread, including the
/// tokio tasks that record gateway outcomes. The HTTP service uses
/// `InMemoryResultStore` instead.
#[derive(Debug)]
pub struct JsonFileResultStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl JsonFileResultStore {
    /// Open the store at `path`; a missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Document::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Document::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), sessions = document.len(), "opened result store");

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Document>, StoreError> {
        self.document
            .lock()
            .map_err(|_| StoreError::Unavailable("file store mutex poisoned".to_string()))
    }

    /// Apply `change` to a copy of the document and keep it only once it is on disk.
    /// `change` returns whether anything was modified.
    fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Document) -> bool,
    {
        let mut document = self.lock()?;
        let mut next = document.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.persist(&next)?;
        *document = next;
        Ok(())
    }

    fn persist(&self, document: &Document) -> Result<(), StoreError> {
        let rendered = serde_json::to_string_pretty(document)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, rendered)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl ResultStore for JsonFileResultStore {
    fn put(&self, session: &SessionId, key: &str, value: String) -> Result<(), StoreError> {
        self.update(|document| {
            document
                .entry(session.clone())
                .or_default()
                .insert(key.to_string(), value);
            true
        })
    }

    fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .lock()?
            .get(session)
            .and_then(|entries| entries.get(key).cloned()))
    }

    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StoreError> {
        self.update(|document| {
            document
                .get_mut(session)
                .and_then(|entries| entries.remove(key))
                .is_some()
        })
    }

    fn clear(&self, session: &SessionId, keys: &[&str]) -> Result<(), StoreError> {
        self.update(|document| {
            let Some(entries) = document.get_mut(session) else {
                return false;
            };
            for key in keys {
                entries.remove(*key);
            }
            if entries.is_empty() {
                document.remove(session);
            }
            true
        })
    }
}
