use crate::workflows::academic::AcademicRecordError;
use crate::workflows::roster::{RosterError, TransportError};

use super::repository::RepositoryError;
use super::rules::RuleValidationError;

/// Pipeline-level failure that aborts a whole preview, confirm or provision call.
#[derive(Debug, thiserror::Error)]
pub enum EligibilityError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Integration(#[from] AcademicRecordError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    RuleValidation(#[from] RuleValidationError),
}

impl From<RepositoryError> for EligibilityError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(what) => Self::Conflict(what),
            RepositoryError::NotFound => Self::NotFound("record".to_string()),
            other => Self::Repository(other),
        }
    }
}

impl EligibilityError {
    pub(crate) fn missing(parameter: &str) -> Self {
        Self::Validation(format!("'{parameter}' is required"))
    }
}
