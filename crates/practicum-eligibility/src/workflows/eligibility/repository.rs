use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DecisionId, DecisionKey, EligibilityStatus, IdentityId, ProfileId};
use super::rules::{EligibilityRule, RuleEvaluationResult};
use crate::workflows::academic::AcademicPlanSnapshot;

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Content of a decision document as written by a confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    #[serde(flatten)]
    pub key: DecisionKey,
    pub full_name: String,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub campus: Option<String>,
    pub practice_type: Option<String>,
    pub faculty_program_link: Option<String>,
    pub identity_id: Option<IdentityId>,
    pub profile_id: Option<ProfileId>,
    pub academic_snapshot: Option<AcademicPlanSnapshot>,
    pub rule_results: Vec<RuleEvaluationResult>,
    pub lookup_error: Option<String>,
    #[serde(rename = "estadoCurricular")]
    pub curricular_status: EligibilityStatus,
    #[serde(rename = "estadoFinal")]
    pub final_status: EligibilityStatus,
    pub final_status_override: Option<FinalStatusOverride>,
    pub confirmed_by: Option<String>,
}

/// Audit trail of a manual change to the final status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalStatusOverride {
    pub status: EligibilityStatus,
    pub actor: String,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

/// Persisted eligibility decision, unique per natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub id: DecisionId,
    #[serde(flatten)]
    pub record: DecisionRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EligibilityDecision {
    /// A write that created the document leaves both timestamps equal.
    pub fn was_created(&self) -> bool {
        self.created_at == self.updated_at
    }
}

/// Optional listing filters; codes match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFilter {
    #[serde(default)]
    pub period_id: Option<String>,
    #[serde(default)]
    pub program_code: Option<String>,
    #[serde(default)]
    pub final_status: Option<EligibilityStatus>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub identification: Option<String>,
}

impl DecisionFilter {
    pub fn matches(&self, decision: &EligibilityDecision) -> bool {
        let record = &decision.record;
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .map(|wanted| wanted.trim().eq_ignore_ascii_case(actual.trim()))
                .unwrap_or(true)
        };

        same(&self.period_id, &record.key.period_id)
            && same(&self.program_code, &record.key.program_code)
            && same(&self.identification, &record.key.identification)
            && same(&self.campus, record.campus.as_deref().unwrap_or_default())
            && self
                .final_status
                .map(|status| status == record.final_status)
                .unwrap_or(true)
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<usize>, per_page: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Items to skip; pages beyond the addressable range saturate to an empty page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn from_sorted(all: Vec<T>, pagination: Pagination) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.per_page)
            .collect();

        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            total_pages: total.div_ceil(pagination.per_page),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub code: String,
    pub secret_digest: String,
    pub module_tag: String,
    pub active: bool,
    pub must_change_secret: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub name: String,
    pub email: String,
    pub code: String,
    pub secret_digest: String,
    pub module_tag: String,
    pub active: bool,
    pub must_change_secret: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: ProfileId,
    pub identity_id: IdentityId,
    pub student_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicSummary {
    pub profile_id: ProfileId,
    pub current_plan: Option<AcademicPlanSnapshot>,
    pub last_finished_plan: Option<AcademicPlanSnapshot>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramLinkKind {
    Enrolled,
    Graduated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramLink {
    pub profile_id: ProfileId,
    pub program_code: String,
    pub program_name: String,
    pub kind: ProgramLinkKind,
    pub graduation_date: Option<NaiveDate>,
}

/// Read-only view over the admin-managed rule configuration.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn active_rules(&self, period_id: &str) -> Result<Vec<EligibilityRule>, RepositoryError>;
}

#[async_trait]
pub trait DecisionRepository: Send + Sync {
    async fn find(&self, key: &DecisionKey) -> Result<Option<EligibilityDecision>, RepositoryError>;
    /// Insert or replace the document for `record.key`, keeping `created_at` on replace.
    async fn upsert(&self, record: DecisionRecord) -> Result<EligibilityDecision, RepositoryError>;
    async fn list(
        &self,
        filter: &DecisionFilter,
        pagination: Pagination,
    ) -> Result<Page<EligibilityDecision>, RepositoryError>;
}

#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_code_or_email(
        &self,
        code: &str,
        email: Option<&str>,
    ) -> Result<Option<Identity>, RepositoryError>;
    async fn create(&self, identity: NewIdentity) -> Result<Identity, RepositoryError>;
}

#[async_trait]
pub trait CandidateProfileStore: Send + Sync {
    async fn find_by_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<CandidateProfile>, RepositoryError>;
    async fn create(
        &self,
        identity_id: IdentityId,
        student_code: String,
    ) -> Result<CandidateProfile, RepositoryError>;
}

#[async_trait]
pub trait AcademicSummaryStore: Send + Sync {
    async fn find_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<AcademicSummary>, RepositoryError>;
    async fn upsert(&self, summary: AcademicSummary) -> Result<AcademicSummary, RepositoryError>;
}

#[async_trait]
pub trait ProgramLinkStore: Send + Sync {
    async fn find(
        &self,
        profile_id: ProfileId,
        program_code: &str,
        kind: ProgramLinkKind,
    ) -> Result<Option<ProgramLink>, RepositoryError>;
    async fn create(&self, link: ProgramLink) -> Result<ProgramLink, RepositoryError>;
}

/// Every store the pipeline reads or writes, shared by preview, confirm and provisioning.
#[derive(Clone)]
pub struct PracticumStores {
    pub rules: Arc<dyn RuleStore>,
    pub decisions: Arc<dyn DecisionRepository>,
    pub identities: Arc<dyn IdentityDirectory>,
    pub profiles: Arc<dyn CandidateProfileStore>,
    pub summaries: Arc<dyn AcademicSummaryStore>,
    pub program_links: Arc<dyn ProgramLinkStore>,
}
