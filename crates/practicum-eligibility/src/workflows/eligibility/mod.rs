//! Curricular-eligibility determination: preview, confirm and provisioning.
//!
//! Candidates are processed strictly one at a time with an explicit pacing delay. Failures
//! for one candidate are recorded against its identification and never abort the batch.

pub mod decisions;
pub mod domain;
pub mod error;
pub mod memory;
pub(crate) mod outcome;
pub mod preview;
pub mod provisioning;
pub mod repository;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use decisions::{
    ConfirmContext, ConfirmRequest, ConfirmSummary, DecisionStore, FinalStatusOverrideRequest,
};
pub use domain::{
    DecisionId, DecisionKey, EligibilityStatus, FinalStatusPolicy, IdentityId, ProfileId,
    RoutingContext, RuleId,
};
pub use error::EligibilityError;
pub use memory::InMemoryDocumentStore;
pub use outcome::ItemError;
pub use preview::{
    EligibilityOrchestrator, PreviewCounts, PreviewItem, PreviewRequest, PreviewResponse,
};
pub use provisioning::{IdentityProvisioner, ProvisionCandidate, ProvisionSummary};
pub use repository::{
    DecisionFilter, DecisionRecord, DecisionRepository, EligibilityDecision, Page, Pagination,
    PracticumStores, RepositoryError,
};
pub use router::eligibility_router;
pub use rules::{EligibilityRule, RuleDraft, RuleEngine, RuleEvaluationResult};
pub use service::EligibilityService;
