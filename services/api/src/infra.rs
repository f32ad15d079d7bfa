use metrics_exporter_prometheus::PrometheusHandle;
use practicum_eligibility::config::PipelineConfig;
use practicum_eligibility::error::AppError;
use practicum_eligibility::workflows::eligibility::{
    EligibilityError, EligibilityRule, InMemoryDocumentStore, RuleDraft,
};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Read a JSON array of rule drafts and validate each one.
pub(crate) fn load_rule_seed(path: &Path) -> Result<Vec<EligibilityRule>, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_rule_seed(&raw).map_err(AppError::from)
}

pub(crate) fn parse_rule_seed(raw: &str) -> Result<Vec<EligibilityRule>, EligibilityError> {
    let drafts: Vec<RuleDraft> = serde_json::from_str(raw)
        .map_err(|err| EligibilityError::Validation(format!("rule seed is not valid JSON: {err}")))?;

    drafts
        .into_iter()
        .map(|draft| EligibilityRule::try_from(draft).map_err(EligibilityError::from))
        .collect()
}

/// Document store for the running service, seeded with rules when a seed file is configured.
pub(crate) fn seeded_store(pipeline: &PipelineConfig) -> Result<InMemoryDocumentStore, AppError> {
    let Some(path) = pipeline.rules_path.as_deref() else {
        warn!("no rule seed configured; every candidate will preview as in review");
        return Ok(InMemoryDocumentStore::default());
    };

    let rules = load_rule_seed(path)?;
    info!(rules = rules.len(), path = %path.display(), "loaded eligibility rules");
    Ok(InMemoryDocumentStore::with_rules(rules))
}
