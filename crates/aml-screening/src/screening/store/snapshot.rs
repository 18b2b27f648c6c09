use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use super::{ResultStore, StoreError, StoreKey};
use crate::screening::domain::{GatewayId, SessionId, SubjectForm};
use crate::screening::lifecycle::{CallState, GatewayCalls};

const RESTORED_ERROR_REASON: &str = "call failed before the session was restored";

/// Everything persisted for one session: the submitted form plus the
/// lifecycle state of every gateway call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub subject: Option<SubjectForm>,
    pub calls: GatewayCalls,
}

impl SessionSnapshot {
    pub fn is_submitted(&self) -> bool {
        self.subject.is_some()
    }

    fn is_empty(&self) -> bool {
        self.subject.is_none() && self.calls.all_idle()
    }
}

/// Typed persistence over the well-known keys of a `ResultStore`.
pub struct SnapshotStore<S> {
    inner: Arc<S>,
}

impl<S> Clone for SnapshotStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> SnapshotStore<S>
where
    S: ResultStore,
{
    pub fn new(inner: Arc<S>) -> Self {
        Self { inner }
    }

    pub fn save(&self, session: &SessionId, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        match &snapshot.subject {
            Some(form) => self.record_subject(session, form)?,
            None => self.inner.remove(session, StoreKey::Subject.as_str())?,
        }
        for (gateway, state) in snapshot.calls.iter() {
            self.record_outcome(session, gateway, state)?;
        }
        Ok(())
    }

    /// Rebuild the snapshot from stored keys; `None` when the session holds nothing.
    ///
    /// Unparseable values are logged and treated as absent.
    pub fn load(&self, session: &SessionId) -> Result<Option<SessionSnapshot>, StoreError> {
        let subject = self.read_json::<SubjectForm>(session, StoreKey::Subject)?;

        let mut calls = GatewayCalls::default();
        for gateway in GatewayId::ALL {
            calls.set(gateway, self.restore_call(session, gateway)?);
        }

        let snapshot = SessionSnapshot { subject, calls };
        Ok((!snapshot.is_empty()).then_some(snapshot))
    }

    pub fn clear(&self, session: &SessionId) -> Result<(), StoreError> {
        self.inner.clear(session, &StoreKey::known_names())
    }

    pub fn record_subject(&self, session: &SessionId, form: &SubjectForm) -> Result<(), StoreError> {
        let rendered = serde_json::to_string(form)?;
        self.inner.put(session, StoreKey::Subject.as_str(), rendered)
    }

    /// Mirror one gateway's state into its response and flag keys.
    pub fn record_outcome(
        &self,
        session: &SessionId,
        gateway: GatewayId,
        state: &CallState,
    ) -> Result<(), StoreError> {
        let response = StoreKey::Response(gateway).as_str();
        let completed = StoreKey::Completed(gateway).as_str();
        let error = StoreKey::Error(gateway).as_str();

        match state {
            CallState::Completed { payload } => {
                self.inner
                    .put(session, response, serde_json::to_string(payload)?)?;
                self.inner.put(session, completed, "true".to_string())?;
                self.inner.remove(session, error)
            }
            CallState::Errored { .. } => {
                self.inner.put(session, completed, "false".to_string())?;
                self.inner.put(session, error, "true".to_string())
            }
            CallState::Idle | CallState::Pending => {
                self.inner.clear(session, &[response, completed, error])
            }
        }
    }

    /// Raw stored text for a key, used by the detail views.
    pub fn raw(&self, session: &SessionId, key: StoreKey) -> Result<Option<String>, StoreError> {
        self.inner.get(session, key.as_str())
    }

    fn restore_call(&self, session: &SessionId, gateway: GatewayId) -> Result<CallState, StoreError> {
        let completed = self
            .read_json::<bool>(session, StoreKey::Completed(gateway))?
            .unwrap_or(false);
        let errored = self
            .read_json::<bool>(session, StoreKey::Error(gateway))?
            .unwrap_or(false);

        if completed {
            if let Some(payload) = self.read_json::<Value>(session, StoreKey::Response(gateway))? {
                return Ok(CallState::Completed { payload });
            }
            warn!(
                session = %session,
                gateway = gateway.number(),
                "completed flag stored without a readable response; restoring as idle"
            );
        }

        if errored {
            return Ok(CallState::Errored {
                reason: RESTORED_ERROR_REASON.to_string(),
            });
        }

        Ok(CallState::Idle)
    }

    fn read_json<T>(&self, session: &SessionId, key: StoreKey) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.inner.get(session, key.as_str())? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(
                    session = %session,
                    key = key.as_str(),
                    error = %err,
                    "ignoring unreadable stored value"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::store::InMemoryResultStore;
    use serde_json::json;

    fn fixture() -> (SnapshotStore<InMemoryResultStore>, Arc<InMemoryResultStore>, SessionId) {
        let backend = Arc::new(InMemoryResultStore::default());
        let store = SnapshotStore::new(Arc::clone(&backend));
        (store, backend, SessionId::parse("tab-1").expect("valid id"))
    }

    #[test]
    fn empty_session_loads_as_none() {
        let (store, _, session) = fixture();
        assert_eq!(store.load(&session).expect("load"), None);
    }

    #[test]
    fn outcomes_write_the_documented_flags() {
        let (store, backend, session) = fixture();

        store
            .record_outcome(
                &session,
                GatewayId::AdverseMedia,
                &CallState::Completed {
                    payload: json!({ "markdown": "# Media" }),
                },
            )
            .expect("record completed");
        store
            .record_outcome(
                &session,
                GatewayId::CourtRecords,
                &CallState::Errored {
                    reason: "502".to_string(),
                },
            )
            .expect("record errored");

        let get = |key: &str| backend.get(&session, key).expect("get");
        assert_eq!(get("apiResponse"), Some("{\"markdown\":\"# Media\"}".to_string()));
        assert_eq!(get("apiCompleted"), Some("true".to_string()));
        assert_eq!(get("node3Error"), None);
        assert_eq!(get("node1Completed"), Some("false".to_string()));
        assert_eq!(get("node1Error"), Some("true".to_string()));
        assert_eq!(get("dashboard1Response"), None);
    }

    #[test]
    fn save_then_load_restores_submitted_session() {
        let (store, _, session) = fixture();
        let mut calls = GatewayCalls::default();
        calls.set(
            GatewayId::Screening,
            CallState::Completed {
                payload: json!("## Screening"),
            },
        );
        calls.set(
            GatewayId::LexisNexis,
            CallState::Errored {
                reason: "timeout".to_string(),
            },
        );
        let snapshot = SessionSnapshot {
            subject: Some(SubjectForm::business(["Acme"])),
            calls,
        };

        store.save(&session, &snapshot).expect("save");
        let restored = store.load(&session).expect("load").expect("snapshot present");

        assert!(restored.is_submitted());
        assert_eq!(restored.subject, snapshot.subject);
        assert_eq!(
            restored.calls.get(GatewayId::Screening),
            &CallState::Completed {
                payload: json!("## Screening")
            }
        );
        assert!(restored.calls.get(GatewayId::LexisNexis).flags().error);
        assert_eq!(restored.calls.get(GatewayId::CourtRecords), &CallState::Idle);
    }

    #[test]
    fn unreadable_values_are_treated_as_absent() {
        let (store, backend, session) = fixture();
        backend
            .put(&session, "lastFormData", "{not json".to_string())
            .expect("put");
        backend
            .put(&session, "node2Completed", "true".to_string())
            .expect("put");
        backend
            .put(&session, "dashboard2Response", "[oops".to_string())
            .expect("put");
        backend
            .put(&session, "node4Error", "true".to_string())
            .expect("put");

        let restored = store.load(&session).expect("load").expect("flags present");
        assert!(!restored.is_submitted());
        assert_eq!(restored.calls.get(GatewayId::Screening), &CallState::Idle);
        assert!(restored.calls.get(GatewayId::LexisNexis).flags().error);
    }

    #[test]
    fn clear_removes_every_known_key() {
        let (store, backend, session) = fixture();
        let snapshot = SessionSnapshot {
            subject: Some(SubjectForm::individual("Ana", "Rusu")),
            calls: GatewayCalls::uniform(CallState::Completed { payload: json!({}) }),
        };
        store.save(&session, &snapshot).expect("save");

        store.clear(&session).expect("clear");

        for key in StoreKey::known_names() {
            assert_eq!(backend.get(&session, key).expect("get"), None, "{key} survived");
        }
        assert_eq!(store.load(&session).expect("load"), None);
    }
}
