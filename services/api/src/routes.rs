use crate::infra::AppState;
use aml_screening::screening::{
    screening_router, NotificationSink, ResultStore, ScreeningGateway, ScreeningOrchestrator,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_screening_routes<G, S, N>(
    orchestrator: Arc<ScreeningOrchestrator<G, S, N>>,
) -> axum::Router
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    screening_router(orchestrator)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use aml_screening::screening::{
        HttpScreeningGateway, InMemoryNotificationSink, InMemoryResultStore,
    };
    use aml_screening::config::GatewayConfig;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let orchestrator = Arc::new(ScreeningOrchestrator::new(
            Arc::new(HttpScreeningGateway::new(GatewayConfig::default())),
            Arc::new(InMemoryResultStore::default()),
            Arc::new(InMemoryNotificationSink::default()),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_screening_routes(orchestrator).layer(Extension(state))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).expect("request builds")
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        let response = app(false).oneshot(get("/ready")).await.expect("responds");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true).oneshot(get("/ready")).await.expect("responds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_and_metrics_are_served_next_to_session_routes() {
        let router = app(true);

        let health = router.clone().oneshot(get("/health")).await.expect("responds");
        assert_eq!(health.status(), StatusCode::OK);

        let metrics = router.clone().oneshot(get("/metrics")).await.expect("responds");
        assert_eq!(
            metrics.headers().get(header::CONTENT_TYPE).map(|value| value.as_bytes()),
            Some(&b"text/plain; version=0.0.4"[..])
        );

        let dashboard = router
            .oneshot(get("/api/v1/sessions/local/dashboard/2"))
            .await
            .expect("responds");
        assert_eq!(dashboard.status(), StatusCode::OK);
    }
}
