use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{SessionId, SubjectForm};
use super::gateway::ScreeningGateway;
use super::notifications::NotificationSink;
use super::orchestrator::ScreeningOrchestrator;
use super::store::ResultStore;
use super::views::CaseQuery;
use crate::error::AppError;

type SharedOrchestrator<G, S, N> = Arc<ScreeningOrchestrator<G, S, N>>;

/// Router builder exposing session, submission and report endpoints.
pub fn screening_router<G, S, N>(orchestrator: SharedOrchestrator<G, S, N>) -> Router
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/sessions", post(create_session_handler))
        .route(
            "/api/v1/sessions/:session_id",
            get(session_handler::<G, S, N>).delete(clear_handler::<G, S, N>),
        )
        .route(
            "/api/v1/sessions/:session_id/submission",
            post(submit_handler::<G, S, N>),
        )
        .route(
            "/api/v1/sessions/:session_id/notifications",
            get(notifications_handler::<G, S, N>),
        )
        .route(
            "/api/v1/sessions/:session_id/dashboard/:view_id",
            get(dashboard_handler::<G, S, N>),
        )
        .with_state(orchestrator)
}

pub(crate) async fn create_session_handler() -> Response {
    let session_id = SessionId::generate();
    (StatusCode::CREATED, Json(json!({ "session_id": session_id }))).into_response()
}

pub(crate) async fn session_handler<G, S, N>(
    State(orchestrator): State<SharedOrchestrator<G, S, N>>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    let session = SessionId::parse(&session_id)?;
    let view = orchestrator.session_view(&session)?;
    Ok((StatusCode::OK, Json(view)).into_response())
}

pub(crate) async fn submit_handler<G, S, N>(
    State(orchestrator): State<SharedOrchestrator<G, S, N>>,
    Path(session_id): Path<String>,
    Json(form): Json<SubjectForm>,
) -> Result<Response, AppError>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    let session = SessionId::parse(&session_id)?;
    orchestrator.submit(&session, form)?;
    let view = orchestrator.session_view(&session)?;
    Ok((StatusCode::ACCEPTED, Json(view)).into_response())
}

pub(crate) async fn clear_handler<G, S, N>(
    State(orchestrator): State<SharedOrchestrator<G, S, N>>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    let session = SessionId::parse(&session_id)?;
    let view = orchestrator.clear(&session)?;
    Ok((StatusCode::OK, Json(view)).into_response())
}

pub(crate) async fn notifications_handler<G, S, N>(
    State(orchestrator): State<SharedOrchestrator<G, S, N>>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    let session = SessionId::parse(&session_id)?;
    let notifications = orchestrator.notifications(&session)?;
    Ok((StatusCode::OK, Json(notifications)).into_response())
}

pub(crate) async fn dashboard_handler<G, S, N>(
    State(orchestrator): State<SharedOrchestrator<G, S, N>>,
    Path((session_id, view_id)): Path<(String, String)>,
    Query(query): Query<CaseQuery>,
) -> Result<Response, AppError>
where
    G: ScreeningGateway + 'static,
    S: ResultStore + 'static,
    N: NotificationSink + 'static,
{
    let session = SessionId::parse(&session_id)?;
    let view = orchestrator.detail_view(&session, &view_id, &query)?;
    Ok((StatusCode::OK, Json(view)).into_response())
}
