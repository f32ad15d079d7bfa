use crate::cli::ServeArgs;
use crate::infra::{seeded_store, AppState};
use crate::routes::with_eligibility_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use practicum_eligibility::config::AppConfig;
use practicum_eligibility::error::AppError;
use practicum_eligibility::telemetry;
use practicum_eligibility::workflows::eligibility::EligibilityService;
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

    let store = seeded_store(&config.pipeline)?;
    let service = Arc::new(EligibilityService::from_config(&config, store.stores())?);

    let app = with_eligibility_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        roster = %config.roster.remote_path,
        policy = ?config.pipeline.final_status_policy,
        "practicum eligibility service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
