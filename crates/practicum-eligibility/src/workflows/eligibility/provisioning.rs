use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::error::EligibilityError;
use super::outcome::{collect_errors, count_ok, ItemError, ItemOutcome};
use super::preview::PreviewItem;
use super::repository::{
    AcademicSummary, CandidateProfile, Identity, NewIdentity, PracticumStores, ProgramLink,
    ProgramLinkKind,
};
use crate::workflows::academic::AcademicPlanSnapshot;
use crate::workflows::roster::RosterRow;

pub const MODULE_TAG: &str = "PRACTICAS";

/// Initial secret for a provisioned identity, derived from the national id.
pub fn initial_secret_digest(identification: &str) -> String {
    format!("{:x}", Sha256::digest(identification.trim().as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionCandidate {
    pub candidate: RosterRow,
    #[serde(default)]
    pub plans: Vec<AcademicPlanSnapshot>,
    #[serde(default)]
    pub exists: bool,
}

impl From<PreviewItem> for ProvisionCandidate {
    fn from(item: PreviewItem) -> Self {
        Self {
            candidate: item.candidate,
            plans: item.plans,
            exists: item.exists,
        }
    }
}

/// What provisioning actually wrote for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProvisionedRecords {
    pub identity_created: bool,
    pub profile_created: bool,
    pub summary_created: bool,
    pub links_created: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionSummary {
    pub requested: usize,
    pub skipped: usize,
    pub provisioned: usize,
    pub identities_created: usize,
    pub profiles_created: usize,
    pub summaries_created: usize,
    pub links_created: usize,
    pub failed: usize,
    pub errors: Vec<ItemError>,
}

impl ProvisionSummary {
    fn from_outcomes(
        requested: usize,
        skipped: usize,
        outcomes: &[ItemOutcome<ProvisionedRecords>],
    ) -> Self {
        let errors = collect_errors(outcomes);
        Self {
            requested,
            skipped,
            provisioned: count_ok(outcomes, |_| true),
            identities_created: count_ok(outcomes, |records| records.identity_created),
            profiles_created: count_ok(outcomes, |records| records.profile_created),
            summaries_created: count_ok(outcomes, |records| records.summary_created),
            links_created: outcomes
                .iter()
                .filter_map(ItemOutcome::value)
                .map(|records| records.links_created)
                .sum(),
            failed: errors.len(),
            errors,
        }
    }
}

/// Creates the identity, profile and academic records missing for new candidates.
pub struct IdentityProvisioner {
    stores: PracticumStores,
}

impl IdentityProvisioner {
    pub fn new(stores: PracticumStores) -> Self {
        Self { stores }
    }

    pub async fn provision_missing(
        &self,
        candidates: Vec<ProvisionCandidate>,
    ) -> Result<ProvisionSummary, EligibilityError> {
        let requested = candidates.len();
        let missing: Vec<ProvisionCandidate> = candidates
            .into_iter()
            .filter(|candidate| !candidate.exists)
            .collect();
        let skipped = requested - missing.len();

        let mut outcomes = Vec::with_capacity(missing.len());
        for candidate in missing {
            let identification = candidate.candidate.identification.trim().to_string();
            let result = self.provision(&candidate).await;
            if let Err(error) = &result {
                warn!(identification = %identification, %error, "provisioning failed");
            }
            outcomes.push(ItemOutcome::from_result(&identification, result));
        }

        let summary = ProvisionSummary::from_outcomes(requested, skipped, &outcomes);
        info!(
            requested = summary.requested,
            skipped = summary.skipped,
            provisioned = summary.provisioned,
            failed = summary.failed,
            "candidate provisioning complete"
        );
        Ok(summary)
    }

    async fn provision(
        &self,
        candidate: &ProvisionCandidate,
    ) -> Result<ProvisionedRecords, EligibilityError> {
        let row = &candidate.candidate;
        let identification = row.identification.trim();
        if identification.is_empty() {
            return Err(EligibilityError::missing("identification"));
        }

        let mut records = ProvisionedRecords::default();

        let (identity, created) = self.ensure_identity(row, identification).await?;
        records.identity_created = created;

        let (profile, created) = self
            .ensure_profile(&identity, candidate, identification)
            .await?;
        records.profile_created = created;

        if self
            .stores
            .summaries
            .find_by_profile(profile.id)
            .await?
            .is_none()
        {
            self.stores
                .summaries
                .upsert(AcademicSummary {
                    profile_id: profile.id,
                    current_plan: candidate.plans.iter().find(|plan| !plan.graduated).cloned(),
                    last_finished_plan: candidate.plans.iter().find(|plan| plan.graduated).cloned(),
                    updated_at: Utc::now(),
                })
                .await?;
            records.summary_created = true;
        }

        for plan in &candidate.plans {
            let kind = if plan.graduated {
                ProgramLinkKind::Graduated
            } else {
                ProgramLinkKind::Enrolled
            };
            let existing = self
                .stores
                .program_links
                .find(profile.id, &plan.program_code, kind)
                .await?;
            if existing.is_some() {
                continue;
            }

            self.stores
                .program_links
                .create(ProgramLink {
                    profile_id: profile.id,
                    program_code: plan.program_code.trim().to_string(),
                    program_name: plan.program_name.clone(),
                    kind,
                    graduation_date: plan.graduation_date,
                })
                .await?;
            records.links_created += 1;
        }

        Ok(records)
    }

    async fn ensure_identity(
        &self,
        row: &RosterRow,
        identification: &str,
    ) -> Result<(Identity, bool), EligibilityError> {
        let email = row.normalized_email();
        if let Some(identity) = self
            .stores
            .identities
            .find_by_code_or_email(identification, email.as_deref())
            .await?
        {
            if identity.code != identification {
                return Err(EligibilityError::Conflict(format!(
                    "email {} already belongs to identity {}",
                    identity.email, identity.code
                )));
            }
            return Ok((identity, false));
        }

        let identity = self
            .stores
            .identities
            .create(NewIdentity {
                name: row.full_name(),
                email: email.unwrap_or_default(),
                code: identification.to_string(),
                secret_digest: initial_secret_digest(identification),
                module_tag: MODULE_TAG.to_string(),
                active: true,
                must_change_secret: true,
            })
            .await?;
        Ok((identity, true))
    }

    async fn ensure_profile(
        &self,
        identity: &Identity,
        candidate: &ProvisionCandidate,
        identification: &str,
    ) -> Result<(CandidateProfile, bool), EligibilityError> {
        if let Some(profile) = self.stores.profiles.find_by_identity(identity.id).await? {
            return Ok((profile, false));
        }

        let profile = self
            .stores
            .profiles
            .create(identity.id, student_code(candidate, identification))
            .await?;
        Ok((profile, true))
    }
}

/// Matriculation code of the requested program's plan, then of any plan, then the national id.
fn student_code(candidate: &ProvisionCandidate, identification: &str) -> String {
    let code_of = |plan: &AcademicPlanSnapshot| {
        plan.matriculation_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
    };

    candidate
        .plans
        .iter()
        .filter(|plan| plan.is_program(&candidate.candidate.program_code))
        .find_map(code_of)
        .or_else(|| candidate.plans.iter().find_map(code_of))
        .unwrap_or_else(|| identification.to_string())
}
