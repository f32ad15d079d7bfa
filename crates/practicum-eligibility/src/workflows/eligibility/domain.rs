use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the curricular check for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    Authorized,
    NotAuthorized,
    InReview,
    /// Only ever set through a manual override.
    Excluded,
}

impl EligibilityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EligibilityStatus::Authorized => "AUTHORIZED",
            EligibilityStatus::NotAuthorized => "NOT_AUTHORIZED",
            EligibilityStatus::InReview => "IN_REVIEW",
            EligibilityStatus::Excluded => "EXCLUDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AUTHORIZED" => Some(Self::Authorized),
            "NOT_AUTHORIZED" => Some(Self::NotAuthorized),
            "IN_REVIEW" => Some(Self::InReview),
            "EXCLUDED" => Some(Self::Excluded),
            _ => None,
        }
    }
}

/// Whether a re-confirmation may overwrite a manually overridden final status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatusPolicy {
    /// Every confirm resets the final status to the computed one.
    #[default]
    Reset,
    /// A manual override survives later confirms.
    PreserveOverride,
}

impl FinalStatusPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reset" => Some(Self::Reset),
            "preserve_override" | "preserve" => Some(Self::PreserveOverride),
            _ => None,
        }
    }
}

/// Natural key of a persisted decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecisionKey {
    pub identification: String,
    pub period_id: String,
    pub program_code: String,
}

impl DecisionKey {
    pub fn new(identification: &str, period_id: &str, program_code: &str) -> Self {
        Self {
            identification: identification.trim().to_string(),
            period_id: period_id.trim().to_string(),
            program_code: program_code.trim().to_ascii_uppercase(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProfileId(pub Uuid);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub String);

/// Pass-through routing data echoed into previews and decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingContext {
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub practice_type: Option<String>,
    #[serde(default)]
    pub faculty_program_link: Option<String>,
}
