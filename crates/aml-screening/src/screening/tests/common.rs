use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::screening::domain::{GatewayId, SessionId};
use crate::screening::gateway::{GatewayError, ScreeningGateway};
use crate::screening::intake::GatewayPayload;
use crate::screening::notifications::InMemoryNotificationSink;
use crate::screening::orchestrator::ScreeningOrchestrator;
use crate::screening::store::InMemoryResultStore;

pub(super) type TestOrchestrator =
    ScreeningOrchestrator<ScriptedGateway, InMemoryResultStore, InMemoryNotificationSink>;

/// Gateway double answering from a per-gateway script.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    responses: HashMap<GatewayId, Result<Value, String>>,
    calls: AtomicUsize,
    payloads: Mutex<Vec<(GatewayId, GatewayPayload)>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedGateway {
    /// Every gateway answers with a small successful payload.
    pub(super) fn succeeding() -> Self {
        let mut gateway = Self::default();
        for id in GatewayId::ALL {
            gateway
                .responses
                .insert(id, Ok(json!({ "markdown": format!("# Report {}", id.number()) })));
        }
        gateway
    }

    pub(super) fn respond(mut self, gateway: GatewayId, payload: Value) -> Self {
        self.responses.insert(gateway, Ok(payload));
        self
    }

    pub(super) fn fail(mut self, gateway: GatewayId, reason: &str) -> Self {
        self.responses.insert(gateway, Err(reason.to_string()));
        self
    }

    /// Calls block until permits are added to the returned semaphore.
    pub(super) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn payload_for(&self, gateway: GatewayId) -> Option<Value> {
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .iter()
            .find(|(id, _)| *id == gateway)
            .map(|(_, payload)| serde_json::to_value(payload).expect("payload serializes"))
    }
}

#[async_trait]
impl ScreeningGateway for ScriptedGateway {
    async fn screen(
        &self,
        gateway: GatewayId,
        payload: &GatewayPayload,
    ) -> Result<Value, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads
            .lock()
            .expect("payload mutex poisoned")
            .push((gateway, payload.clone()));

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate open");
        }

        match self.responses.get(&gateway) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(reason)) => Err(GatewayError::CallFailed {
                gateway,
                reason: reason.clone(),
            }),
            None => Err(GatewayError::ConfigurationMissing(gateway)),
        }
    }
}

pub(super) struct Harness {
    pub(super) orchestrator: TestOrchestrator,
    pub(super) gateway: Arc<ScriptedGateway>,
    pub(super) store: Arc<InMemoryResultStore>,
    pub(super) notifications: Arc<InMemoryNotificationSink>,
}

pub(super) fn harness(gateway: ScriptedGateway) -> Harness {
    harness_with_store(gateway, Arc::new(InMemoryResultStore::default()))
}

pub(super) fn harness_with_store(
    gateway: ScriptedGateway,
    store: Arc<InMemoryResultStore>,
) -> Harness {
    let gateway = Arc::new(gateway);
    let notifications = Arc::new(InMemoryNotificationSink::default());
    let orchestrator = ScreeningOrchestrator::new(
        Arc::clone(&gateway),
        Arc::clone(&store),
        Arc::clone(&notifications),
    );
    Harness {
        orchestrator,
        gateway,
        store,
        notifications,
    }
}

pub(super) fn session(name: &str) -> SessionId {
    SessionId::parse(name).expect("valid session id")
}

pub(super) fn court_report() -> Value {
    json!({
        "searched_subject": { "name": "Acme SRL", "identifier": "1003600012345", "identifier_type": "IDNO" },
        "consentsSigned": true,
        "aggregated_report": {
            "header": {
                "search_date": "2025-03-01",
                "total_cases": 2,
                "lost_cases_adverse_position": 1,
                "won_cases_adverse_position": 1,
                "pending_cases_adverse_position": 0,
                "overall_risk_level": "Medium"
            },
            "narrative_summary": "Two commercial disputes.",
            "aggregated_flags": {},
            "cases": [
                { "case_number": "2a-101/21", "case_topic": "Supply contract", "decision_date": "2021-04-02", "outcome_for_subject": "losing" },
                { "case_number": "3r-55/23", "case_topic": "Customs audit", "decision_date": "2023-09-14", "outcome_for_subject": "winning" }
            ]
        }
    })
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
