use std::sync::Arc;
use std::time::Duration;

use super::decisions::{ConfirmRequest, ConfirmSummary, DecisionStore, FinalStatusOverrideRequest};
use super::domain::FinalStatusPolicy;
use super::error::EligibilityError;
use super::preview::{EligibilityOrchestrator, PreviewRequest, PreviewResponse};
use super::provisioning::{IdentityProvisioner, ProvisionCandidate, ProvisionSummary};
use super::repository::{DecisionFilter, EligibilityDecision, Page, Pagination, PracticumStores};
use crate::config::AppConfig;
use crate::workflows::academic::{AcademicRecordClient, AcademicRecordSource};
use crate::workflows::roster::{HttpRosterTransport, RosterCache};

/// Composition root wiring the roster cache, academic source and stores together.
pub struct EligibilityService {
    orchestrator: EligibilityOrchestrator,
    decisions: DecisionStore,
    provisioner: IdentityProvisioner,
}

impl EligibilityService {
    pub fn new(
        orchestrator: EligibilityOrchestrator,
        decisions: DecisionStore,
        provisioner: IdentityProvisioner,
    ) -> Self {
        Self {
            orchestrator,
            decisions,
            provisioner,
        }
    }

    /// Build the HTTP-backed pipeline described by `config` over the given stores.
    pub fn from_config(
        config: &AppConfig,
        stores: PracticumStores,
    ) -> Result<Self, EligibilityError> {
        let transport = Arc::new(HttpRosterTransport::new(&config.roster));
        let cache = Arc::new(RosterCache::new(transport));
        let academic: Arc<dyn AcademicRecordSource> =
            Arc::new(AcademicRecordClient::new(&config.academic)?);

        Ok(Self::with_components(
            cache,
            academic,
            stores,
            config.roster.remote_path.clone(),
            config.pipeline.pacing,
            config.pipeline.final_status_policy,
        ))
    }

    pub fn with_components(
        cache: Arc<RosterCache>,
        academic: Arc<dyn AcademicRecordSource>,
        stores: PracticumStores,
        roster_path: String,
        pacing: Duration,
        policy: FinalStatusPolicy,
    ) -> Self {
        let orchestrator =
            EligibilityOrchestrator::new(cache, academic, stores.clone(), roster_path, pacing);
        let decisions = DecisionStore::new(stores.decisions.clone(), policy);
        let provisioner = IdentityProvisioner::new(stores);
        Self::new(orchestrator, decisions, provisioner)
    }

    pub async fn list_decisions(
        &self,
        filter: &DecisionFilter,
        pagination: Pagination,
    ) -> Result<Page<EligibilityDecision>, EligibilityError> {
        self.decisions.list_decisions(filter, pagination).await
    }

    pub async fn run_preview(
        &self,
        request: PreviewRequest,
    ) -> Result<PreviewResponse, EligibilityError> {
        self.orchestrator.run_preview(request).await
    }

    pub async fn confirm(&self, request: ConfirmRequest) -> Result<ConfirmSummary, EligibilityError> {
        self.decisions.confirm(request).await
    }

    pub async fn provision_missing(
        &self,
        candidates: Vec<ProvisionCandidate>,
    ) -> Result<ProvisionSummary, EligibilityError> {
        self.provisioner.provision_missing(candidates).await
    }

    pub async fn override_final_status(
        &self,
        request: FinalStatusOverrideRequest,
    ) -> Result<EligibilityDecision, EligibilityError> {
        self.decisions.override_final_status(request).await
    }
}
