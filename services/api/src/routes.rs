use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use practicum_eligibility::workflows::eligibility::{eligibility_router, EligibilityService};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_eligibility_routes(service: Arc<EligibilityService>) -> Router {
    eligibility_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
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
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use practicum_eligibility::workflows::academic::{
        AcademicPlanSnapshot, AcademicRecordError, AcademicRecordSource,
    };
    use practicum_eligibility::workflows::eligibility::{FinalStatusPolicy, InMemoryDocumentStore};
    use practicum_eligibility::workflows::roster::{
        RemoteSession, RosterCache, RosterTransport, TransportError,
    };
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::ServiceExt;

    struct NoRoster;

    #[async_trait::async_trait]
    impl RosterTransport for NoRoster {
        async fn connect(&self) -> Result<Box<dyn RemoteSession>, TransportError> {
            Err(TransportError::Connection("offline".to_string()))
        }
    }

    struct NoRecords;

    #[async_trait::async_trait]
    impl AcademicRecordSource for NoRecords {
        async fn plans_for(
            &self,
            _identification: &str,
        ) -> Result<Vec<AcademicPlanSnapshot>, AcademicRecordError> {
            Ok(Vec::new())
        }
    }

    fn app(ready: bool) -> Router {
        let service = EligibilityService::with_components(
            Arc::new(RosterCache::new(Arc::new(NoRoster))),
            Arc::new(NoRecords),
            InMemoryDocumentStore::default().stores(),
            "practicas.csv".to_string(),
            Duration::ZERO,
            FinalStatusPolicy::Reset,
        );
        let recorder = PrometheusBuilder::new().build_recorder();
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        };
        with_eligibility_routes(Arc::new(service)).layer(Extension(state))
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let response = app(false)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let pending = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(pending.status(), StatusCode::SERVICE_UNAVAILABLE);

        let ready = app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn eligibility_routes_are_mounted() {
        let response = app(true)
            .oneshot(
                Request::get("/api/v1/eligibility/decisions")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
