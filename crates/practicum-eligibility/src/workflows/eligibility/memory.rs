//! In-process document store backing every repository trait.
//!
//! Used by the service binary in development and by the test suites.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use super::domain::{DecisionId, DecisionKey, IdentityId, ProfileId};
use super::repository::{
    AcademicSummary, AcademicSummaryStore, CandidateProfile, CandidateProfileStore,
    DecisionFilter, DecisionRecord, DecisionRepository, EligibilityDecision, Identity,
    IdentityDirectory, NewIdentity, Page, Pagination, PracticumStores, ProgramLink,
    ProgramLinkKind, ProgramLinkStore, RepositoryError, RuleStore,
};
use super::rules::EligibilityRule;

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<EligibilityRule>>,
}

impl MemoryRuleStore {
    pub fn new(rules: Vec<EligibilityRule>) -> Self {
        Self {
            rules: Mutex::new(rules),
        }
    }

    pub fn replace(&self, rules: Vec<EligibilityRule>) -> Result<(), RepositoryError> {
        *lock(&self.rules)? = rules;
        Ok(())
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn active_rules(&self, period_id: &str) -> Result<Vec<EligibilityRule>, RepositoryError> {
        let rules = lock(&self.rules)?;
        Ok(rules
            .iter()
            .filter(|rule| rule.active && rule.period_id.trim() == period_id.trim())
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDecisionRepository {
    decisions: Mutex<BTreeMap<DecisionKey, EligibilityDecision>>,
}

impl MemoryDecisionRepository {
    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.decisions)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(lock(&self.decisions)?.is_empty())
    }
}

#[async_trait]
impl DecisionRepository for MemoryDecisionRepository {
    async fn find(&self, key: &DecisionKey) -> Result<Option<EligibilityDecision>, RepositoryError> {
        Ok(lock(&self.decisions)?.get(key).cloned())
    }

    async fn upsert(&self, record: DecisionRecord) -> Result<EligibilityDecision, RepositoryError> {
        let mut decisions = lock(&self.decisions)?;
        let now = Utc::now();

        let stored = match decisions.get(&record.key) {
            Some(existing) => {
                // Replacements must stay distinguishable from creations.
                let updated_at = if now > existing.created_at {
                    now
                } else {
                    existing.created_at + Duration::microseconds(1)
                };
                EligibilityDecision {
                    id: existing.id,
                    record,
                    created_at: existing.created_at,
                    updated_at,
                }
            }
            None => EligibilityDecision {
                id: DecisionId(Uuid::new_v4()),
                record,
                created_at: now,
                updated_at: now,
            },
        };

        decisions.insert(stored.record.key.clone(), stored.clone());
        Ok(stored)
    }

    async fn list(
        &self,
        filter: &DecisionFilter,
        pagination: Pagination,
    ) -> Result<Page<EligibilityDecision>, RepositoryError> {
        let mut matching: Vec<EligibilityDecision> = lock(&self.decisions)?
            .values()
            .filter(|decision| filter.matches(decision))
            .cloned()
            .collect();

        matching.sort_by(|left, right| {
            let left = &left.record.key;
            let right = &right.record.key;
            (&left.period_id, &left.program_code, &left.identification).cmp(&(
                &right.period_id,
                &right.program_code,
                &right.identification,
            ))
        });

        Ok(Page::from_sorted(matching, pagination))
    }
}

#[derive(Debug, Default)]
pub struct MemoryIdentityDirectory {
    identities: Mutex<Vec<Identity>>,
}

impl MemoryIdentityDirectory {
    pub fn all(&self) -> Result<Vec<Identity>, RepositoryError> {
        Ok(lock(&self.identities)?.clone())
    }
}

fn same_email(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

#[async_trait]
impl IdentityDirectory for MemoryIdentityDirectory {
    async fn find_by_code_or_email(
        &self,
        code: &str,
        email: Option<&str>,
    ) -> Result<Option<Identity>, RepositoryError> {
        let identities = lock(&self.identities)?;
        let code = code.trim();
        let email = email.map(str::trim).filter(|email| !email.is_empty());

        Ok(identities
            .iter()
            .find(|identity| {
                (!code.is_empty() && identity.code == code)
                    || email
                        .map(|email| same_email(&identity.email, email))
                        .unwrap_or(false)
            })
            .cloned())
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, RepositoryError> {
        let mut identities = lock(&self.identities)?;

        if identities.iter().any(|existing| existing.code == identity.code) {
            return Err(RepositoryError::Conflict(format!(
                "identity code '{}'",
                identity.code
            )));
        }
        if !identity.email.is_empty()
            && identities
                .iter()
                .any(|existing| same_email(&existing.email, &identity.email))
        {
            return Err(RepositoryError::Conflict(format!(
                "identity email '{}'",
                identity.email
            )));
        }

        let created = Identity {
            id: IdentityId(Uuid::new_v4()),
            name: identity.name,
            email: identity.email,
            code: identity.code,
            secret_digest: identity.secret_digest,
            module_tag: identity.module_tag,
            active: identity.active,
            must_change_secret: identity.must_change_secret,
            created_at: Utc::now(),
        };
        identities.push(created.clone());
        Ok(created)
    }
}

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<IdentityId, CandidateProfile>>,
}

impl MemoryProfileStore {
    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(lock(&self.profiles)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(lock(&self.profiles)?.is_empty())
    }
}

#[async_trait]
impl CandidateProfileStore for MemoryProfileStore {
    async fn find_by_identity(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<CandidateProfile>, RepositoryError> {
        Ok(lock(&self.profiles)?.get(&identity_id).cloned())
    }

    async fn create(
        &self,
        identity_id: IdentityId,
        student_code: String,
    ) -> Result<CandidateProfile, RepositoryError> {
        let mut profiles = lock(&self.profiles)?;
        if profiles.contains_key(&identity_id) {
            return Err(RepositoryError::Conflict(format!(
                "profile for identity {}",
                identity_id.0
            )));
        }

        let profile = CandidateProfile {
            id: ProfileId(Uuid::new_v4()),
            identity_id,
            student_code,
            created_at: Utc::now(),
        };
        profiles.insert(identity_id, profile.clone());
        Ok(profile)
    }
}

#[derive(Debug, Default)]
pub struct MemorySummaryStore {
    summaries: Mutex<HashMap<ProfileId, AcademicSummary>>,
}

#[async_trait]
impl AcademicSummaryStore for MemorySummaryStore {
    async fn find_by_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<AcademicSummary>, RepositoryError> {
        Ok(lock(&self.summaries)?.get(&profile_id).cloned())
    }

    async fn upsert(&self, summary: AcademicSummary) -> Result<AcademicSummary, RepositoryError> {
        lock(&self.summaries)?.insert(summary.profile_id, summary.clone());
        Ok(summary)
    }
}

#[derive(Debug, Default)]
pub struct MemoryProgramLinkStore {
    links: Mutex<Vec<ProgramLink>>,
}

impl MemoryProgramLinkStore {
    pub fn for_profile(&self, profile_id: ProfileId) -> Result<Vec<ProgramLink>, RepositoryError> {
        Ok(lock(&self.links)?
            .iter()
            .filter(|link| link.profile_id == profile_id)
            .cloned()
            .collect())
    }
}

fn same_link(
    link: &ProgramLink,
    profile_id: ProfileId,
    program_code: &str,
    kind: ProgramLinkKind,
) -> bool {
    link.profile_id == profile_id
        && link.kind == kind
        && link.program_code.eq_ignore_ascii_case(program_code.trim())
}

#[async_trait]
impl ProgramLinkStore for MemoryProgramLinkStore {
    async fn find(
        &self,
        profile_id: ProfileId,
        program_code: &str,
        kind: ProgramLinkKind,
    ) -> Result<Option<ProgramLink>, RepositoryError> {
        Ok(lock(&self.links)?
            .iter()
            .find(|link| same_link(link, profile_id, program_code, kind))
            .cloned())
    }

    async fn create(&self, link: ProgramLink) -> Result<ProgramLink, RepositoryError> {
        let mut links = lock(&self.links)?;
        if links
            .iter()
            .any(|existing| same_link(existing, link.profile_id, &link.program_code, link.kind))
        {
            return Err(RepositoryError::Conflict(format!(
                "program link {}",
                link.program_code
            )));
        }
        links.push(link.clone());
        Ok(link)
    }
}

/// Concrete handles to every in-memory store, kept so callers can inspect state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    pub rules: Arc<MemoryRuleStore>,
    pub decisions: Arc<MemoryDecisionRepository>,
    pub identities: Arc<MemoryIdentityDirectory>,
    pub profiles: Arc<MemoryProfileStore>,
    pub summaries: Arc<MemorySummaryStore>,
    pub program_links: Arc<MemoryProgramLinkStore>,
}

impl InMemoryDocumentStore {
    pub fn with_rules(rules: Vec<EligibilityRule>) -> Self {
        Self {
            rules: Arc::new(MemoryRuleStore::new(rules)),
            ..Self::default()
        }
    }

    pub fn stores(&self) -> PracticumStores {
        PracticumStores {
            rules: self.rules.clone(),
            decisions: self.decisions.clone(),
            identities: self.identities.clone(),
            profiles: self.profiles.clone(),
            summaries: self.summaries.clone(),
            program_links: self.program_links.clone(),
        }
    }
}
