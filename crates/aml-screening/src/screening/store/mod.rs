//! Session-scoped result storage.
//!
//! `ResultStore` is a plain string key/value store partitioned by session.
//! `SnapshotStore` layers the typed `SessionSnapshot` record on top of the
//! well-known keys listed by `StoreKey`.

mod file;
mod memory;
mod snapshot;

pub use file::JsonFileResultStore;
pub use memory::InMemoryResultStore;
pub use snapshot::{SessionSnapshot, SnapshotStore};

use super::domain::{GatewayId, SessionId};

/// Backing store for session data; values are JSON text.
pub trait ResultStore: Send + Sync {
    fn put(&self, session: &SessionId, key: &str, value: String) -> Result<(), StoreError>;
    fn get(&self, session: &SessionId, key: &str) -> Result<Option<String>, StoreError>;
    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StoreError>;
    /// Remove every listed key for the session; unknown keys are ignored.
    fn clear(&self, session: &SessionId, keys: &[&str]) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("result store unavailable: {0}")]
    Unavailable(String),
    #[error("result store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("result store document is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The well-known keys written for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Subject,
    Response(GatewayId),
    Completed(GatewayId),
    Error(GatewayId),
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::Subject => "lastFormData",
            StoreKey::Response(GatewayId::CourtRecords) => "dashboard1Response",
            StoreKey::Response(GatewayId::Screening) => "dashboard2Response",
            StoreKey::Response(GatewayId::AdverseMedia) => "apiResponse",
            StoreKey::Response(GatewayId::LexisNexis) => "dashboard4Response",
            StoreKey::Completed(GatewayId::CourtRecords) => "node1Completed",
            StoreKey::Completed(GatewayId::Screening) => "node2Completed",
            StoreKey::Completed(GatewayId::AdverseMedia) => "apiCompleted",
            StoreKey::Completed(GatewayId::LexisNexis) => "node4Completed",
            StoreKey::Error(GatewayId::CourtRecords) => "node1Error",
            StoreKey::Error(GatewayId::Screening) => "node2Error",
            StoreKey::Error(GatewayId::AdverseMedia) => "node3Error",
            StoreKey::Error(GatewayId::LexisNexis) => "node4Error",
        }
    }

    pub fn known() -> Vec<StoreKey> {
        let mut keys = vec![StoreKey::Subject];
        for gateway in GatewayId::ALL {
            keys.push(StoreKey::Response(gateway));
            keys.push(StoreKey::Completed(gateway));
            keys.push(StoreKey::Error(gateway));
        }
        keys
    }

    pub fn known_names() -> Vec<&'static str> {
        Self::known().into_iter().map(StoreKey::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn known_keys_are_distinct() {
        let names = StoreKey::known_names();
        assert_eq!(names.len(), 13);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
