use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{DecisionKey, EligibilityStatus, FinalStatusPolicy};
use super::error::EligibilityError;
use super::outcome::{collect_errors, count_ok, ItemError, ItemOutcome};
use super::preview::PreviewItem;
use super::repository::{
    DecisionFilter, DecisionRecord, DecisionRepository, EligibilityDecision, FinalStatusOverride,
    Page, Pagination, RepositoryError,
};

/// Period and program shared by every item of a confirm batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmContext {
    pub period_id: String,
    pub program_code: String,
    #[serde(default)]
    pub practice_type: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub confirmed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    #[serde(flatten)]
    pub context: ConfirmContext,
    pub decisions: Vec<PreviewItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionWrite {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub errors: Vec<ItemError>,
}

impl ConfirmSummary {
    fn from_outcomes(outcomes: &[ItemOutcome<DecisionWrite>]) -> Self {
        let errors = collect_errors(outcomes);
        Self {
            total: outcomes.len(),
            created: count_ok(outcomes, |write| *write == DecisionWrite::Created),
            updated: count_ok(outcomes, |write| *write == DecisionWrite::Updated),
            failed: errors.len(),
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalStatusOverrideRequest {
    pub identification: String,
    pub period_id: String,
    pub program_code: String,
    pub status: EligibilityStatus,
    pub actor: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Idempotent persistence of confirmed preview items.
pub struct DecisionStore {
    repository: Arc<dyn DecisionRepository>,
    policy: FinalStatusPolicy,
}

impl DecisionStore {
    pub fn new(repository: Arc<dyn DecisionRepository>, policy: FinalStatusPolicy) -> Self {
        Self { repository, policy }
    }

    pub fn policy(&self) -> FinalStatusPolicy {
        self.policy
    }

    pub async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmSummary, EligibilityError> {
        let context = request.context;
        if context.period_id.trim().is_empty() {
            return Err(EligibilityError::missing("period_id"));
        }
        if context.program_code.trim().is_empty() {
            return Err(EligibilityError::missing("program_code"));
        }

        let mut outcomes = Vec::with_capacity(request.decisions.len());
        for item in request.decisions {
            let identification = item.candidate.identification.trim().to_string();
            let result = self.confirm_item(&context, item).await;
            if let Err(error) = &result {
                warn!(identification = %identification, %error, "decision upsert failed");
            }
            outcomes.push(ItemOutcome::from_result(&identification, result));
        }

        let summary = ConfirmSummary::from_outcomes(&outcomes);
        info!(
            program = %context.program_code,
            period = %context.period_id,
            created = summary.created,
            updated = summary.updated,
            failed = summary.failed,
            "decisions confirmed"
        );
        Ok(summary)
    }

    async fn confirm_item(
        &self,
        context: &ConfirmContext,
        item: PreviewItem,
    ) -> Result<DecisionWrite, EligibilityError> {
        if item.candidate.identification.trim().is_empty() {
            return Err(EligibilityError::missing("identification"));
        }

        let key = DecisionKey::new(
            &item.candidate.identification,
            &context.period_id,
            &context.program_code,
        );

        let preserved = match self.policy {
            FinalStatusPolicy::Reset => None,
            FinalStatusPolicy::PreserveOverride => self
                .repository
                .find(&key)
                .await?
                .and_then(|existing| existing.record.final_status_override),
        };

        let (final_status, final_status_override) = match preserved {
            Some(manual) => (manual.status, Some(manual)),
            None => (item.status, None),
        };

        let candidate = item.candidate;
        let record = DecisionRecord {
            key,
            full_name: candidate.full_name(),
            email: candidate.normalized_email(),
            gender: candidate.gender,
            mobile: candidate.mobile,
            campus: context
                .campus
                .clone()
                .or(item.context.campus)
                .or(candidate.campus),
            practice_type: context
                .practice_type
                .clone()
                .or(item.context.practice_type)
                .or(candidate.practice_type),
            faculty_program_link: item.context.faculty_program_link,
            identity_id: item.identity_id,
            profile_id: item.profile_id,
            academic_snapshot: item.matched_plan,
            rule_results: item.rule_results,
            lookup_error: item.lookup_error,
            curricular_status: item.status,
            final_status,
            final_status_override,
            confirmed_by: context.confirmed_by.clone(),
        };

        let stored = self.repository.upsert(record).await?;
        Ok(if stored.was_created() {
            DecisionWrite::Created
        } else {
            DecisionWrite::Updated
        })
    }

    pub async fn list_decisions(
        &self,
        filter: &DecisionFilter,
        pagination: Pagination,
    ) -> Result<Page<EligibilityDecision>, EligibilityError> {
        Ok(self.repository.list(filter, pagination).await?)
    }

    pub async fn override_final_status(
        &self,
        request: FinalStatusOverrideRequest,
    ) -> Result<EligibilityDecision, EligibilityError> {
        let actor = request.actor.trim();
        if actor.is_empty() {
            return Err(EligibilityError::missing("actor"));
        }

        let key = DecisionKey::new(
            &request.identification,
            &request.period_id,
            &request.program_code,
        );
        let not_found =
            || EligibilityError::NotFound(format!("decision for '{}'", key.identification));
        let existing = self.repository.find(&key).await?.ok_or_else(not_found)?;

        let mut record = existing.record;
        record.final_status = request.status;
        record.final_status_override = Some(FinalStatusOverride {
            status: request.status,
            actor: actor.to_string(),
            note: request.note.filter(|note| !note.trim().is_empty()),
            at: Utc::now(),
        });

        let stored = self
            .repository
            .upsert(record)
            .await
            .map_err(|error| match error {
                RepositoryError::NotFound => not_found(),
                other => other.into(),
            })?;

        info!(
            identification = %stored.record.key.identification,
            program = %stored.record.key.program_code,
            period = %stored.record.key.period_id,
            status = request.status.label(),
            actor = %actor,
            "final status overridden"
        );
        Ok(stored)
    }
}
