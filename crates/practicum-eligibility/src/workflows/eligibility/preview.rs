use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{EligibilityStatus, IdentityId, ProfileId, RoutingContext};
use super::error::EligibilityError;
use super::outcome::ItemError;
use super::repository::PracticumStores;
use super::rules::{EligibilityRule, RuleEngine, RuleEvaluationResult, RuleSetEvaluation};
use crate::workflows::academic::{AcademicPlanSnapshot, AcademicRecordSource};
use crate::workflows::roster::{parse_roster, RosterCache, RosterRow};

pub const EMPTY_ROSTER_MESSAGE: &str = "no roster candidates matched the requested program";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRequest {
    pub program_code: String,
    pub period_id: String,
    #[serde(flatten)]
    pub context: RoutingContext,
}

/// One candidate's computed outcome. Never persisted by the preview itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewItem {
    pub candidate: RosterRow,
    pub identity_id: Option<IdentityId>,
    pub profile_id: Option<ProfileId>,
    /// Whether an identity already exists for the candidate.
    pub exists: bool,
    pub matched_plan: Option<AcademicPlanSnapshot>,
    #[serde(default)]
    pub plans: Vec<AcademicPlanSnapshot>,
    #[serde(default)]
    pub rule_results: Vec<RuleEvaluationResult>,
    #[serde(rename = "estadoCurricular")]
    pub status: EligibilityStatus,
    #[serde(default)]
    pub lookup_error: Option<String>,
    #[serde(default)]
    pub plan_error: Option<String>,
    #[serde(default)]
    pub context: RoutingContext,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewCounts {
    pub authorized: usize,
    pub not_authorized: usize,
    pub in_review: usize,
}

impl PreviewCounts {
    fn from_items(items: &[PreviewItem]) -> Self {
        let count = |status: EligibilityStatus| {
            items.iter().filter(|item| item.status == status).count()
        };
        Self {
            authorized: count(EligibilityStatus::Authorized),
            not_authorized: count(EligibilityStatus::NotAuthorized),
            in_review: count(EligibilityStatus::InReview),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub program_code: String,
    pub period_id: String,
    pub total: usize,
    pub counts: PreviewCounts,
    pub items: Vec<PreviewItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ItemError>,
}

impl PreviewResponse {
    fn empty(request: &PreviewRequest) -> Self {
        Self {
            program_code: request.program_code.clone(),
            period_id: request.period_id.clone(),
            total: 0,
            counts: PreviewCounts::default(),
            items: Vec::new(),
            message: Some(EMPTY_ROSTER_MESSAGE.to_string()),
            errors: Vec::new(),
        }
    }
}

/// Sequential preview over the filtered roster.
pub struct EligibilityOrchestrator {
    cache: Arc<RosterCache>,
    academic: Arc<dyn AcademicRecordSource>,
    stores: PracticumStores,
    engine: RuleEngine,
    roster_path: String,
    pacing: Duration,
}

impl EligibilityOrchestrator {
    pub fn new(
        cache: Arc<RosterCache>,
        academic: Arc<dyn AcademicRecordSource>,
        stores: PracticumStores,
        roster_path: impl Into<String>,
        pacing: Duration,
    ) -> Self {
        Self {
            cache,
            academic,
            stores,
            engine: RuleEngine::new(),
            roster_path: roster_path.into(),
            pacing,
        }
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    pub async fn run_preview(
        &self,
        request: PreviewRequest,
    ) -> Result<PreviewResponse, EligibilityError> {
        let request = PreviewRequest {
            program_code: request.program_code.trim().to_string(),
            period_id: request.period_id.trim().to_string(),
            context: request.context,
        };
        if request.program_code.is_empty() {
            return Err(EligibilityError::missing("program_code"));
        }
        if request.period_id.is_empty() {
            return Err(EligibilityError::missing("period_id"));
        }

        let bytes = self.cache.get_roster_bytes(&self.roster_path).await?;
        let candidates = parse_roster(&bytes, Some(&request.program_code))?;

        if candidates.is_empty() {
            info!(
                program = %request.program_code,
                period = %request.period_id,
                "roster has no candidates for program"
            );
            return Ok(PreviewResponse::empty(&request));
        }

        let rules: Vec<EligibilityRule> = self
            .stores
            .rules
            .active_rules(&request.period_id)
            .await?
            .into_iter()
            .filter(|rule| rule.applies_to(&request.program_code, &request.period_id))
            .collect();

        let mut items = Vec::with_capacity(candidates.len());
        let mut errors = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            if index > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }
            let item = self
                .preview_candidate(candidate, &request, &rules, &mut errors)
                .await;
            items.push(item);
        }

        let counts = PreviewCounts::from_items(&items);
        info!(
            program = %request.program_code,
            period = %request.period_id,
            total = items.len(),
            rules = rules.len(),
            authorized = counts.authorized,
            not_authorized = counts.not_authorized,
            in_review = counts.in_review,
            "eligibility preview complete"
        );

        Ok(PreviewResponse {
            program_code: request.program_code,
            period_id: request.period_id,
            total: items.len(),
            counts,
            items,
            message: None,
            errors,
        })
    }

    async fn preview_candidate(
        &self,
        candidate: RosterRow,
        request: &PreviewRequest,
        rules: &[EligibilityRule],
        errors: &mut Vec<ItemError>,
    ) -> PreviewItem {
        let identification = candidate.identification.clone();
        let email = candidate.normalized_email();

        let identity = match self
            .stores
            .identities
            .find_by_code_or_email(&identification, email.as_deref())
            .await
        {
            Ok(identity) => identity,
            Err(error) => {
                warn!(identification = %identification, %error, "identity lookup failed");
                errors.push(ItemError::new(&identification, &error));
                None
            }
        };

        let profile = match &identity {
            Some(identity) => match self.stores.profiles.find_by_identity(identity.id).await {
                Ok(profile) => profile,
                Err(error) => {
                    warn!(identification = %identification, %error, "profile lookup failed");
                    errors.push(ItemError::new(&identification, &error));
                    None
                }
            },
            None => None,
        };

        let (plans, lookup_error) = match self.academic.plans_for(&identification).await {
            Ok(plans) => (plans, None),
            Err(error) => {
                warn!(identification = %identification, %error, "academic lookup failed");
                errors.push(ItemError::new(&identification, &error));
                (Vec::new(), Some(error.to_string()))
            }
        };

        let matched_plan = plans
            .iter()
            .find(|plan| plan.is_program(&request.program_code))
            .cloned();
        let plan_error = (lookup_error.is_none() && matched_plan.is_none())
            .then(|| format!("plan not found for program '{}'", request.program_code));

        let evaluation = if lookup_error.is_none() && !rules.is_empty() {
            self.engine
                .evaluate_all(rules, &plans, &request.program_code)
        } else {
            RuleSetEvaluation {
                status: EligibilityStatus::InReview,
                results: Vec::new(),
            }
        };

        debug!(
            identification = %identification,
            status = evaluation.status.label(),
            "candidate evaluated"
        );

        let context = RoutingContext {
            campus: request.context.campus.clone().or_else(|| candidate.campus.clone()),
            practice_type: request
                .context
                .practice_type
                .clone()
                .or_else(|| candidate.practice_type.clone()),
            faculty_program_link: request.context.faculty_program_link.clone(),
        };

        PreviewItem {
            exists: identity.is_some(),
            identity_id: identity.map(|identity| identity.id),
            profile_id: profile.map(|profile| profile.id),
            candidate,
            matched_plan,
            plans,
            rule_results: evaluation.results,
            status: evaluation.status,
            lookup_error,
            plan_error,
            context,
        }
    }
}
