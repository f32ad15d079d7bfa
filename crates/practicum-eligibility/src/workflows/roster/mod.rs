mod cache;
mod columns;
mod parser;
pub mod transport;

pub use cache::RosterCache;
pub use parser::parse_roster;
pub use transport::{HttpRosterTransport, RemoteSession, RosterTransport, TransportError};

use serde::{Deserialize, Serialize};

/// One nominated candidate as listed in the roster export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRow {
    pub program_code: String,
    #[serde(default)]
    pub secondary_program_code: Option<String>,
    pub identification: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_names: String,
    #[serde(default)]
    pub last_names: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub campus: Option<String>,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub practice_type: Option<String>,
}

impl RosterRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
            .trim()
            .to_string()
    }

    /// Lowercased, trimmed e-mail used for identity matching.
    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|email| email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
    }

    pub(crate) fn matches_program(&self, program_code: &str) -> bool {
        self.program_code.eq_ignore_ascii_case(program_code)
            || self
                .secondary_program_code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(program_code))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("roster export is not valid tabular data: {0}")]
    Malformed(#[from] csv::Error),
    #[error("roster workbook could not be read: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("roster workbook has no worksheets")]
    NoWorksheet,
}
