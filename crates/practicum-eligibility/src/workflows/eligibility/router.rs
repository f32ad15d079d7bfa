use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::decisions::{ConfirmRequest, FinalStatusOverrideRequest};
use super::domain::EligibilityStatus;
use super::error::EligibilityError;
use super::preview::PreviewRequest;
use super::provisioning::ProvisionCandidate;
use super::repository::{DecisionFilter, Pagination};
use super::service::EligibilityService;

/// Router builder exposing the pipeline's preview, confirm and provisioning endpoints.
pub fn eligibility_router(service: Arc<EligibilityService>) -> Router {
    Router::new()
        .route("/api/v1/eligibility/decisions", get(list_handler))
        .route(
            "/api/v1/eligibility/decisions/final-status",
            put(override_handler),
        )
        .route("/api/v1/eligibility/preview", post(preview_handler))
        .route("/api/v1/eligibility/confirm", post(confirm_handler))
        .route("/api/v1/eligibility/provision", post(provision_handler))
        .with_state(service)
}

impl EligibilityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EligibilityError::Validation(_)
            | EligibilityError::RuleValidation(_)
            | EligibilityError::Roster(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EligibilityError::Transport(_) | EligibilityError::Integration(_) => {
                StatusCode::BAD_GATEWAY
            }
            EligibilityError::NotFound(_) => StatusCode::NOT_FOUND,
            EligibilityError::Conflict(_) => StatusCode::CONFLICT,
            EligibilityError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EligibilityError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.to_string() });
        (self.status_code(), Json(payload)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DecisionQuery {
    period_id: Option<String>,
    program_code: Option<String>,
    final_status: Option<String>,
    campus: Option<String>,
    identification: Option<String>,
    page: Option<usize>,
    per_page: Option<usize>,
}

impl DecisionQuery {
    fn into_parts(self) -> Result<(DecisionFilter, Pagination), EligibilityError> {
        let final_status = match self.final_status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(EligibilityStatus::parse(raw).ok_or_else(|| {
                EligibilityError::Validation(format!("unknown final status '{raw}'"))
            })?),
        };

        let filter = DecisionFilter {
            period_id: self.period_id,
            program_code: self.program_code,
            final_status,
            campus: self.campus,
            identification: self.identification,
        };
        Ok((filter, Pagination::new(self.page, self.per_page)))
    }
}

pub(crate) async fn list_handler(
    State(service): State<Arc<EligibilityService>>,
    Query(query): Query<DecisionQuery>,
) -> Result<Response, EligibilityError> {
    let (filter, pagination) = query.into_parts()?;
    let page = service.list_decisions(&filter, pagination).await?;
    Ok((StatusCode::OK, Json(page)).into_response())
}

pub(crate) async fn preview_handler(
    State(service): State<Arc<EligibilityService>>,
    Json(request): Json<PreviewRequest>,
) -> Result<Response, EligibilityError> {
    let preview = service.run_preview(request).await?;
    Ok((StatusCode::OK, Json(preview)).into_response())
}

pub(crate) async fn confirm_handler(
    State(service): State<Arc<EligibilityService>>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Response, EligibilityError> {
    let summary = service.confirm(request).await?;
    Ok((StatusCode::OK, Json(summary)).into_response())
}

pub(crate) async fn provision_handler(
    State(service): State<Arc<EligibilityService>>,
    Json(candidates): Json<Vec<ProvisionCandidate>>,
) -> Result<Response, EligibilityError> {
    let summary = service.provision_missing(candidates).await?;
    Ok((StatusCode::OK, Json(summary)).into_response())
}

pub(crate) async fn override_handler(
    State(service): State<Arc<EligibilityService>>,
    Json(request): Json<FinalStatusOverrideRequest>,
) -> Result<Response, EligibilityError> {
    let decision = service.override_final_status(request).await?;
    Ok((StatusCode::OK, Json(decision)).into_response())
}
