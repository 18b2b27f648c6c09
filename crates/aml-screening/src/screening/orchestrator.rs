use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::domain::{GatewayId, SessionId, Subject, SubjectForm};
use super::gateway::{GatewayError, ScreeningGateway};
use super::intake::SubjectValidationError;
use super::lifecycle::{CallState, GatewayCallView, GatewayCalls};
use super::notifications::{Notification, NotificationError, NotificationSink};
use super::store::{ResultStore, SessionSnapshot, SnapshotStore, StoreError, StoreKey};
use super::views::{CaseQuery, DetailView};

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission() -> u64 {
    SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// In-memory state for one session.
#[derive(Debug, Default)]
struct SessionRuntime {
    /// Identity of the live submission; outcomes tagged with any other number are stale.
    submission: u64,
    subject: Option<SubjectForm>,
    calls: GatewayCalls,
    coordinator: Option<AbortHandle>,
}

impl SessionRuntime {
    fn restored(snapshot: SessionSnapshot) -> Self {
        Self {
            submission: 0,
            subject: snapshot.subject,
            calls: snapshot.calls,
            coordinator: None,
        }
    }

    fn view(&self, session_id: &SessionId) -> SessionView {
        SessionView {
            session_id: session_id.clone(),
            submitted: self.subject.is_some(),
            display_name: self
                .subject
                .as_ref()
                .and_then(|form| form.validate().ok())
                .map(|subject| subject.display_name()),
            subject: self.subject.clone(),
            calls: self
                .calls
                .iter()
                .map(|(gateway, state)| GatewayCallView::new(gateway, state))
                .collect(),
            all_settled: self.calls.all_settled(),
        }
    }
}

/// Snapshot of a session handed to API and CLI callers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub calls: Vec<GatewayCallView>,
    pub all_settled: bool,
}

impl SessionView {
    pub fn call(&self, gateway: GatewayId) -> Option<&GatewayCallView> {
        self.calls.iter().find(|call| call.gateway == gateway)
    }
}

/// Completion handle for the four calls of one submission.
#[derive(Debug)]
pub struct SubmissionHandle {
    pub session_id: SessionId,
    pub submission: u64,
    coordinator: JoinHandle<()>,
}

impl SubmissionHandle {
    /// Wait until every call has settled. Returns `false` when the submission
    /// was cancelled by a clear before that happened.
    pub async fn settled(self) -> bool {
        match self.coordinator.await {
            Ok(()) => true,
            Err(err) if err.is_cancelled() => false,
            Err(err) => {
                warn!(session = %self.session_id, error = %err, "submission coordinator failed");
                false
            }
        }
    }
}

struct Shared<G, S, N> {
    gateway: Arc<G>,
    store: SnapshotStore<S>,
    notifications: Arc<N>,
    sessions: Mutex<HashMap<SessionId, SessionRuntime>>,
}

/// Fans a submission out to every gateway and tracks each call's lifecycle.
pub struct ScreeningOrchestrator<G, S, N> {
    shared: Arc<Shared<G, S, N>>,
}

impl<G, S, N> Clone for ScreeningOrchestrator<G, S, N> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G, S, N> ScreeningOrchestrator<G, S, N>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(gateway: Arc<G>, store: Arc<S>, notifications: Arc<N>) -> Self {
        Self {
            shared: Arc::new(Shared {
                gateway,
                store: SnapshotStore::new(store),
                notifications,
                sessions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Validate the form, persist it and issue all four gateway calls.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        session: &SessionId,
        form: SubjectForm,
    ) -> Result<SubmissionHandle, OrchestratorError> {
        let subject = form.validate()?;
        let runtime = Handle::try_current().map_err(|_| OrchestratorError::RuntimeUnavailable)?;

        let mut sessions = self.shared.lock_sessions()?;
        let submitted = self
            .shared
            .hydrate(&mut sessions, session)?
            .is_some_and(|state| state.subject.is_some());
        if submitted {
            return Err(OrchestratorError::AlreadySubmitted(session.clone()));
        }

        let pending = GatewayCalls::uniform(CallState::Pending);
        self.shared.store.save(
            session,
            &SessionSnapshot {
                subject: Some(form.clone()),
                calls: pending.clone(),
            },
        )?;

        let submission = next_submission();
        info!(
            session = %session,
            submission,
            subject = %subject.display_name(),
            "screening submitted"
        );

        let coordinator = runtime.spawn(coordinate(
            Arc::clone(&self.shared),
            session.clone(),
            submission,
            subject,
        ));

        let state = sessions.entry(session.clone()).or_default();
        state.submission = submission;
        state.subject = Some(form);
        state.calls = pending;
        state.coordinator = Some(coordinator.abort_handle());

        Ok(SubmissionHandle {
            session_id: session.clone(),
            submission,
            coordinator,
        })
    }

    /// Current view of a session, restoring it from the store if needed.
    pub fn session_view(&self, session: &SessionId) -> Result<SessionView, OrchestratorError> {
        let mut sessions = self.shared.lock_sessions()?;
        let view = match self.shared.hydrate(&mut sessions, session)? {
            Some(state) => state.view(session),
            None => SessionRuntime::default().view(session),
        };
        Ok(view)
    }

    /// Cancel in-flight calls, forget the subject and wipe the session's stored keys.
    pub fn clear(&self, session: &SessionId) -> Result<SessionView, OrchestratorError> {
        let mut sessions = self.shared.lock_sessions()?;
        // outcomes still in flight find no runtime in `settle` and are dropped
        if let Some(coordinator) = sessions
            .remove(session)
            .and_then(|mut state| state.coordinator.take())
        {
            coordinator.abort();
        }
        self.shared.store.clear(session)?;

        if let Err(err) = self.shared.notifications.drain(session) {
            warn!(session = %session, error = %err, "failed to discard pending notifications");
        }

        info!(session = %session, "session cleared");
        Ok(SessionRuntime::default().view(session))
    }

    /// Render detail view `view_id` from the session's stored responses.
    pub fn detail_view(
        &self,
        session: &SessionId,
        view_id: &str,
        query: &CaseQuery,
    ) -> Result<DetailView, OrchestratorError> {
        let Ok(gateway) = view_id.parse::<GatewayId>() else {
            return Ok(DetailView::unavailable(view_id));
        };
        let stored = self.shared.store.raw(session, StoreKey::Response(gateway))?;
        Ok(DetailView::render(gateway, stored.as_deref(), query))
    }

    #[cfg(test)]
    pub(crate) fn cached_sessions(&self) -> usize {
        self.shared
            .sessions
            .lock()
            .map(|sessions| sessions.len())
            .unwrap_or_default()
    }

    /// Take the notifications raised for a session since the last call.
    pub fn notifications(&self, session: &SessionId) -> Result<Vec<Notification>, OrchestratorError> {
        Ok(self.shared.notifications.drain(session)?)
    }
}

impl<G, S, N> Shared<G, S, N>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    fn lock_sessions(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<SessionId, SessionRuntime>>, OrchestratorError> {
        self.sessions
            .lock()
            .map_err(|_| OrchestratorError::StateUnavailable)
    }

    /// Runtime for `session`, restored from the store on first use.
    ///
    /// Sessions with nothing stored are not cached.
    fn hydrate<'a>(
        &self,
        sessions: &'a mut HashMap<SessionId, SessionRuntime>,
        session: &SessionId,
    ) -> Result<Option<&'a mut SessionRuntime>, StoreError> {
        match sessions.entry(session.clone()) {
            Entry::Occupied(entry) => Ok(Some(entry.into_mut())),
            Entry::Vacant(entry) => {
                let Some(snapshot) = self.store.load(session)? else {
                    return Ok(None);
                };
                if snapshot.is_submitted() {
                    info!(session = %session, "restored submitted session from store");
                }
                Ok(Some(entry.insert(SessionRuntime::restored(snapshot))))
            }
        }
    }

    /// Record one call's outcome unless the submission has since been cleared.
    fn settle(
        &self,
        session: &SessionId,
        submission: u64,
        gateway: GatewayId,
        outcome: Result<Value, GatewayError>,
    ) {
        let state = match outcome {
            Ok(payload) => {
                debug!(session = %session, gateway = gateway.number(), "gateway call completed");
                CallState::Completed { payload }
            }
            Err(err) => {
                warn!(session = %session, gateway = gateway.number(), error = %err, "gateway call failed");
                CallState::Errored {
                    reason: err.to_string(),
                }
            }
        };
        let errored = state.flags().error;

        {
            let Ok(mut sessions) = self.sessions.lock() else {
                warn!(session = %session, "session state poisoned; dropping gateway outcome");
                return;
            };
            let current = sessions
                .get_mut(session)
                .filter(|runtime| runtime.submission == submission);
            let Some(runtime) = current else {
                info!(
                    session = %session,
                    submission,
                    gateway = gateway.number(),
                    "discarding response for a cleared submission"
                );
                return;
            };

            if let Err(err) = self.store.record_outcome(session, gateway, &state) {
                warn!(session = %session, gateway = gateway.number(), error = %err, "failed to persist gateway outcome");
            }
            runtime.calls.set(gateway, state);
            if runtime.calls.all_settled() {
                runtime.coordinator = None;
            }
        }

        if errored {
            let notification = Notification::gateway_failed(session.clone(), gateway);
            if let Err(err) = self.notifications.publish(notification) {
                warn!(session = %session, error = %err, "failed to publish notification");
            }
        }
    }
}

async fn coordinate<G, S, N>(
    shared: Arc<Shared<G, S, N>>,
    session: SessionId,
    submission: u64,
    subject: Subject,
) where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    let mut calls = JoinSet::new();
    for gateway in GatewayId::ALL {
        let payload = subject.payload_for(gateway);
        let shared = Arc::clone(&shared);
        let session = session.clone();
        calls.spawn(async move {
            let outcome = shared.gateway.screen(gateway, &payload).await;
            shared.settle(&session, submission, gateway, outcome);
        });
    }

    while let Some(joined) = calls.join_next().await {
        if let Err(err) = joined {
            warn!(session = %session, submission, error = %err, "gateway task ended abnormally");
        }
    }
    info!(session = %session, submission, "all gateway calls settled");
}

/// Error raised by the screening orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Validation(#[from] SubjectValidationError),
    #[error("session {0} already has a submission; clear it first")]
    AlreadySubmitted(SessionId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error("session state unavailable")]
    StateUnavailable,
    #[error("no async runtime available to issue gateway calls")]
    RuntimeUnavailable,
}
