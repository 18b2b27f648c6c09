use std::sync::Arc;

use serde_json::json;

use super::common::*;
use crate::screening::domain::{GatewayId, SubjectForm};
use crate::screening::notifications::NotificationSink;
use crate::screening::orchestrator::OrchestratorError;
use crate::screening::store::{InMemoryResultStore, ResultStore, StoreKey};
use crate::screening::views::{CaseQuery, DetailBody};

#[tokio::test]
async fn each_gateway_settles_independently() {
    let harness = harness(ScriptedGateway::succeeding().fail(GatewayId::Screening, "HTTP 502"));
    let tab = session("tab-1");

    let handle = harness
        .orchestrator
        .submit(&tab, SubjectForm::individual("Ion", "Popescu"))
        .expect("submission accepted");
    assert!(handle.settled().await);

    let view = harness.orchestrator.session_view(&tab).expect("view");
    assert!(view.submitted);
    assert!(view.all_settled);
    assert_eq!(view.display_name.as_deref(), Some("Ion Popescu"));
    for call in &view.calls {
        assert!(
            call.flags.completed ^ call.flags.error,
            "gateway {} must be completed xor errored",
            call.gateway
        );
        assert!(!call.flags.processing);
    }
    let failed = view.call(GatewayId::Screening).expect("gateway 2 listed");
    assert!(failed.flags.error);
    assert_eq!(failed.reason.as_deref(), Some("gateway 2 (Screening) call failed: HTTP 502"));

    let stored = |key: &str| harness.store.get(&tab, key).expect("store read");
    assert_eq!(stored("node2Error"), Some("true".to_string()));
    assert_eq!(stored("node2Completed"), Some("false".to_string()));
    assert_eq!(stored("dashboard2Response"), None);
    assert_eq!(stored("node1Completed"), Some("true".to_string()));
    assert_eq!(stored("node1Error"), None);
    assert!(stored("lastFormData").is_some());

    let notifications = harness.notifications.drain(&tab).expect("drain");
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].description,
        "Failed to fetch data for Screening. Please try again."
    );
}

#[tokio::test]
async fn business_payloads_differ_per_gateway() {
    let harness = harness(ScriptedGateway::succeeding());
    let tab = session("tab-2");

    let handle = harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Acme", "", "Beta"]))
        .expect("submission accepted");
    handle.settled().await;

    assert_eq!(harness.gateway.call_count(), 4);
    for gateway in [GatewayId::CourtRecords, GatewayId::Screening, GatewayId::AdverseMedia] {
        assert_eq!(harness.gateway.payload_for(gateway), Some(json!({ "name": "Acme" })));
    }
    assert_eq!(
        harness.gateway.payload_for(GatewayId::LexisNexis),
        Some(json!({ "entityType": "Business", "companyNames": ["Acme", "Beta"] }))
    );
}

#[tokio::test]
async fn invalid_forms_issue_no_calls() {
    let harness = harness(ScriptedGateway::succeeding());
    let tab = session("tab-3");

    let err = harness
        .orchestrator
        .submit(&tab, SubjectForm::individual("I", "Popescu"))
        .expect_err("first name too short");

    assert!(matches!(err, OrchestratorError::Validation(_)));
    assert_eq!(harness.gateway.call_count(), 0);
    assert_eq!(harness.store.get(&tab, "lastFormData").expect("read"), None);
    assert!(!harness.orchestrator.session_view(&tab).expect("view").submitted);
}

#[tokio::test]
async fn second_submission_requires_a_clear() {
    let harness = harness(ScriptedGateway::succeeding());
    let tab = session("tab-4");

    harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Acme"]))
        .expect("first submission")
        .settled()
        .await;

    let err = harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Beta"]))
        .expect_err("locked while submitted");
    assert!(matches!(err, OrchestratorError::AlreadySubmitted(ref id) if id == &tab));

    harness.orchestrator.clear(&tab).expect("clear");
    harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Beta"]))
        .expect("accepted after clear")
        .settled()
        .await;
    assert_eq!(harness.gateway.call_count(), 8);
}

#[tokio::test]
async fn restore_rehydrates_without_reissuing_calls() {
    let store = Arc::new(InMemoryResultStore::default());
    let tab = session("tab-5");
    let form = serde_json::to_string(&SubjectForm::individual("Ana", "Rusu")).expect("form json");
    store.put(&tab, "lastFormData", form).expect("seed form");
    store
        .put(&tab, "dashboard1Response", court_report().to_string())
        .expect("seed response");
    store.put(&tab, "node1Completed", "true".to_string()).expect("seed flag");
    store.put(&tab, "node3Error", "true".to_string()).expect("seed flag");

    let harness = harness_with_store(ScriptedGateway::succeeding(), store);
    let view = harness.orchestrator.session_view(&tab).expect("restored view");

    assert!(view.submitted);
    assert_eq!(harness.gateway.call_count(), 0);
    assert!(view.call(GatewayId::CourtRecords).expect("listed").flags.completed);
    assert!(view.call(GatewayId::AdverseMedia).expect("listed").flags.error);
    assert_eq!(view.call(GatewayId::Screening).expect("listed").status, "idle");
    assert!(!view.all_settled);

    let err = harness
        .orchestrator
        .submit(&tab, SubjectForm::individual("Ana", "Rusu"))
        .expect_err("restored session is submitted");
    assert!(matches!(err, OrchestratorError::AlreadySubmitted(_)));
}

#[tokio::test]
async fn clear_cancels_in_flight_calls() {
    let (gateway, gate) = ScriptedGateway::succeeding().gated();
    let harness = harness(gateway);
    let tab = session("tab-6");

    let handle = harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Acme"]))
        .expect("submission accepted");
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    let pending = harness.orchestrator.session_view(&tab).expect("view");
    assert!(pending.calls.iter().all(|call| call.flags.processing));

    let cleared = harness.orchestrator.clear(&tab).expect("clear");
    gate.add_permits(4);
    assert!(!handle.settled().await, "cleared submission never settles");
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }

    assert!(!cleared.submitted);
    for key in StoreKey::known_names() {
        assert_eq!(harness.store.get(&tab, key).expect("read"), None, "{key} written after clear");
    }
    let view = harness.orchestrator.session_view(&tab).expect("view");
    for call in &view.calls {
        assert!(!call.flags.processing && !call.flags.completed && !call.flags.error);
    }
}

#[tokio::test]
async fn unknown_and_cleared_sessions_are_not_retained() {
    let harness = harness(ScriptedGateway::succeeding());

    for id in ["tab-unknown-1", "tab-unknown-2", "tab-unknown-3"] {
        let tab = session(id);
        let view = harness.orchestrator.session_view(&tab).expect("view");
        assert!(!view.submitted);
        harness.orchestrator.clear(&tab).expect("clear");
    }
    assert_eq!(harness.orchestrator.cached_sessions(), 0);

    let tab = session("tab-9");
    harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Acme"]))
        .expect("submission accepted")
        .settled()
        .await;
    assert_eq!(harness.orchestrator.cached_sessions(), 1);

    harness.orchestrator.clear(&tab).expect("clear");
    assert_eq!(harness.orchestrator.cached_sessions(), 0);
    assert!(!harness.orchestrator.session_view(&tab).expect("view").submitted);
    assert_eq!(harness.orchestrator.cached_sessions(), 0);
}

#[tokio::test]
async fn detail_views_read_stored_responses() {
    let harness = harness(
        ScriptedGateway::succeeding()
            .respond(GatewayId::CourtRecords, json!([{ "output": court_report() }]))
            .respond(GatewayId::AdverseMedia, json!({ "content": "**bold**" })),
    );
    let tab = session("tab-7");
    harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Acme"]))
        .expect("submission accepted")
        .settled()
        .await;

    let media = harness
        .orchestrator
        .detail_view(&tab, "3", &CaseQuery::default())
        .expect("view 3");
    let DetailBody::Markdown(markdown) = media.body else {
        panic!("expected markdown, got {:?}", media.body);
    };
    assert_eq!(markdown.source, "**bold**");
    assert!(markdown.html.contains("<strong>bold</strong>"));

    let court = harness
        .orchestrator
        .detail_view(&tab, "1", &CaseQuery::default())
        .expect("view 1");
    let DetailBody::CaseReport(report) = court.body else {
        panic!("expected case report, got {:?}", court.body);
    };
    assert_eq!(report.summary.overall_risk_level, "Medium");
    assert_eq!(report.cases[0].case_number, "3r-55/23");

    let unknown = harness
        .orchestrator
        .detail_view(&tab, "dashboard", &CaseQuery::default())
        .expect("placeholder");
    assert_eq!(unknown.title, "Dashboard for ID: dashboard");
}

#[test]
fn submit_outside_a_runtime_is_reported() {
    let harness = harness(ScriptedGateway::succeeding());
    let tab = session("tab-8");

    let err = harness
        .orchestrator
        .submit(&tab, SubjectForm::business(["Acme"]))
        .expect_err("no runtime");

    assert!(matches!(err, OrchestratorError::RuntimeUnavailable));
    assert_eq!(harness.store.get(&tab, "lastFormData").expect("read"), None);
}
