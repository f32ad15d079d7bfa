use super::common::*;
use std::sync::Arc;

use async_trait::async_trait;

use crate::workflows::eligibility::domain::EligibilityStatus;
use crate::workflows::eligibility::memory::{InMemoryDocumentStore, MemoryIdentityDirectory};
use crate::workflows::eligibility::provisioning::{
    initial_secret_digest, IdentityProvisioner, ProvisionCandidate, MODULE_TAG,
};
use crate::workflows::eligibility::repository::{
    AcademicSummaryStore, CandidateProfileStore, Identity, IdentityDirectory, NewIdentity,
    ProgramLinkKind, RepositoryError,
};

fn graduated_plan() -> crate::workflows::academic::AcademicPlanSnapshot {
    let mut finished = plan("TL01", 90.0);
    finished.graduated = true;
    finished.matriculation_code = None;
    finished.graduation_date = chrono::NaiveDate::from_ymd_opt(2021, 12, 10);
    finished
}

fn candidate(identification: &str) -> ProvisionCandidate {
    ProvisionCandidate {
        candidate: roster_row(identification, "AE02"),
        plans: vec![graduated_plan(), plan("AE02", 80.0)],
        exists: false,
    }
}

#[tokio::test]
async fn provisions_identity_profile_summary_and_links() {
    let store = InMemoryDocumentStore::default();
    let provisioner = IdentityProvisioner::new(store.stores());

    let summary = provisioner
        .provision_missing(vec![candidate("123")])
        .await
        .expect("provision");

    assert_eq!(summary.provisioned, 1);
    assert_eq!(summary.identities_created, 1);
    assert_eq!(summary.profiles_created, 1);
    assert_eq!(summary.summaries_created, 1);
    assert_eq!(summary.links_created, 2);
    assert_eq!(summary.failed, 0);

    let identity = store
        .identities
        .find_by_code_or_email("123", None)
        .await
        .expect("lookup")
        .expect("identity created");
    assert_eq!(identity.module_tag, MODULE_TAG);
    assert!(identity.must_change_secret);
    assert!(identity.active);
    assert_eq!(identity.secret_digest, initial_secret_digest("123"));
    assert_eq!(identity.email, "123@uni.edu.co");

    let profile = store
        .profiles
        .find_by_identity(identity.id)
        .await
        .expect("lookup")
        .expect("profile created");
    assert_eq!(profile.student_code, "M-AE02");

    let academic = store
        .summaries
        .find_by_profile(profile.id)
        .await
        .expect("lookup")
        .expect("summary created");
    assert_eq!(
        academic.current_plan.map(|plan| plan.program_code),
        Some("AE02".to_string())
    );
    assert_eq!(
        academic.last_finished_plan.map(|plan| plan.program_code),
        Some("TL01".to_string())
    );

    let links = store.program_links.for_profile(profile.id).expect("links");
    assert!(links
        .iter()
        .any(|link| link.program_code == "TL01" && link.kind == ProgramLinkKind::Graduated));
    assert!(links
        .iter()
        .any(|link| link.program_code == "AE02" && link.kind == ProgramLinkKind::Enrolled));
}

#[tokio::test]
async fn provisioning_twice_creates_nothing_new() {
    let store = InMemoryDocumentStore::default();
    let provisioner = IdentityProvisioner::new(store.stores());

    provisioner
        .provision_missing(vec![candidate("123")])
        .await
        .expect("first");
    let second = provisioner
        .provision_missing(vec![candidate("123")])
        .await
        .expect("second");

    assert_eq!(second.provisioned, 1);
    assert_eq!(second.identities_created, 0);
    assert_eq!(second.profiles_created, 0);
    assert_eq!(second.summaries_created, 0);
    assert_eq!(second.links_created, 0);
    assert_eq!(store.identities.all().expect("identities").len(), 1);
}

#[tokio::test]
async fn student_code_falls_back_to_national_id() {
    let store = InMemoryDocumentStore::default();
    let provisioner = IdentityProvisioner::new(store.stores());
    let mut bare = candidate("321");
    bare.plans.clear();

    provisioner
        .provision_missing(vec![bare])
        .await
        .expect("provision");

    let identity = store
        .identities
        .find_by_code_or_email("321", None)
        .await
        .expect("lookup")
        .expect("identity");
    let profile = store
        .profiles
        .find_by_identity(identity.id)
        .await
        .expect("lookup")
        .expect("profile");
    assert_eq!(profile.student_code, "321");
}

#[tokio::test]
async fn existing_candidates_are_skipped() {
    let store = InMemoryDocumentStore::default();
    let provisioner = IdentityProvisioner::new(store.stores());
    let mut known = candidate("123");
    known.exists = true;

    let summary = provisioner
        .provision_missing(vec![known, candidate("456")])
        .await
        .expect("provision");

    assert_eq!(summary.requested, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.provisioned, 1);
    assert_eq!(store.identities.all().expect("identities").len(), 1);
}

#[tokio::test]
async fn shared_email_with_another_code_is_a_conflict() {
    let store = InMemoryDocumentStore::default();
    let provisioner = IdentityProvisioner::new(store.stores());
    let mut impostor = candidate("456");
    impostor.candidate.email = Some("123@uni.edu.co".to_string());
    impostor.plans = vec![plan("IQ01", 40.0)];

    let summary = provisioner
        .provision_missing(vec![candidate("123"), impostor])
        .await
        .expect("provision");

    assert_eq!(summary.provisioned, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].identification, "456");
    assert!(summary.errors[0].message.contains("conflict"));

    let identity = store
        .identities
        .find_by_code_or_email("123", None)
        .await
        .expect("lookup")
        .expect("identity");
    let profile = store
        .profiles
        .find_by_identity(identity.id)
        .await
        .expect("lookup")
        .expect("profile");
    let links = store.program_links.for_profile(profile.id).expect("links");
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|link| link.program_code != "IQ01"));
    assert_eq!(store.identities.all().expect("identities").len(), 1);
}

/// Directory whose lookups always miss, so duplicate codes reach `create` and collide.
struct BlindDirectory(MemoryIdentityDirectory);

#[async_trait]
impl IdentityDirectory for BlindDirectory {
    async fn find_by_code_or_email(
        &self,
        _code: &str,
        _email: Option<&str>,
    ) -> Result<Option<Identity>, RepositoryError> {
        Ok(None)
    }

    async fn create(&self, identity: NewIdentity) -> Result<Identity, RepositoryError> {
        self.0.create(identity).await
    }
}

#[tokio::test]
async fn a_collision_is_recorded_and_the_rest_continue() {
    let store = InMemoryDocumentStore::default();
    let mut stores = store.stores();
    stores.identities = Arc::new(BlindDirectory(MemoryIdentityDirectory::default()));
    let provisioner = IdentityProvisioner::new(stores);

    let summary = provisioner
        .provision_missing(vec![candidate("123"), candidate("123"), candidate("456")])
        .await
        .expect("provision");

    assert_eq!(summary.requested, 3);
    assert_eq!(summary.provisioned, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errors[0].identification, "123");
    assert!(summary.errors[0].message.contains("conflict"));
}

#[tokio::test]
async fn preview_items_convert_into_provision_candidates() {
    let item = preview_item("123", EligibilityStatus::InReview);
    let candidate = ProvisionCandidate::from(item.clone());

    assert_eq!(candidate.candidate, item.candidate);
    assert_eq!(candidate.plans.len(), 1);
    assert!(!candidate.exists);
}
