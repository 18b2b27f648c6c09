use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_screening_routes;
use aml_screening::config::AppConfig;
use aml_screening::error::AppError;
use aml_screening::screening::{
    HttpScreeningGateway, InMemoryNotificationSink, InMemoryResultStore, ScreeningOrchestrator,
};
use aml_screening::telemetry::{self, LogSink};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, LogSink::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let configured = config.gateways.endpoints.len();
    if configured < 4 {
        warn!(configured, "not every screening gateway has an endpoint; those calls will fail");
    }

    let orchestrator = Arc::new(ScreeningOrchestrator::new(
        Arc::new(HttpScreeningGateway::new(config.gateways.clone())),
        Arc::new(InMemoryResultStore::default()),
        Arc::new(InMemoryNotificationSink::default()),
    ));

    let app = with_screening_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "aml screening service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
