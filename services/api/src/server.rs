use crate::cli::ServeArgs;
use crate::infra::{seed_standard_departments, AppState};
use crate::routes::with_clearance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use clearance_tracker::config::AppConfig;
use clearance_tracker::error::AppError;
use clearance_tracker::telemetry;
use clearance_tracker::workflows::clearance::{ClearanceWorkflow, InMemoryClearanceStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryClearanceStore::default());
    let service = Arc::new(ClearanceWorkflow::new(store, config.certificates.clone()));
    if args.seed {
        seed_standard_departments(&service)?;
    }

    let app = with_clearance_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        certificates = config.certificates.base_path(),
        "clearance tracker ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
