//! Plan snapshots as reported by the external academic-records service.

mod client;

pub use client::AcademicRecordClient;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One program of study for a person. A person may hold several (in progress and finished).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicPlanSnapshot {
    #[serde(rename = "cod_plan")]
    pub program_code: String,
    #[serde(rename = "plan", default)]
    pub program_name: String,
    #[serde(rename = "cod_facultad", default)]
    pub faculty_code: Option<String>,
    #[serde(rename = "facultad", default)]
    pub faculty_name: Option<String>,
    #[serde(
        rename = "creditos_matriculados",
        default,
        deserialize_with = "lenient_number"
    )]
    pub credits_matriculated: f64,
    #[serde(
        rename = "creditos_conseguidos",
        default,
        deserialize_with = "lenient_number"
    )]
    pub credits_approved: f64,
    #[serde(rename = "creditos_totales", default, deserialize_with = "lenient_number")]
    pub credits_total: f64,
    /// Per-typology breakdown keyed by the one-letter typology code.
    #[serde(rename = "tipologias", default)]
    pub typologies: BTreeMap<String, TypologyCredits>,
    #[serde(
        rename = "promedio_acumulado",
        default,
        deserialize_with = "lenient_optional_number"
    )]
    pub cumulative_average: Option<f64>,
    #[serde(
        rename = "semestre_por_creditos",
        default,
        deserialize_with = "lenient_optional_number"
    )]
    pub semester_by_credits: Option<f64>,
    #[serde(rename = "graduado", default)]
    pub graduated: bool,
    #[serde(rename = "fecha_grado", default)]
    pub graduation_date: Option<NaiveDate>,
    #[serde(rename = "nivel_educativo", default)]
    pub education_level: Option<String>,
    #[serde(rename = "cod_matricula", default)]
    pub matriculation_code: Option<String>,
}

impl AcademicPlanSnapshot {
    pub fn is_program(&self, program_code: &str) -> bool {
        self.program_code.trim().eq_ignore_ascii_case(program_code.trim())
    }

    /// Typology breakdown for `code`, matched case-insensitively.
    pub fn typology(&self, code: &str) -> Option<&TypologyCredits> {
        self.typologies
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(code))
            .map(|(_, credits)| credits)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TypologyCredits {
    #[serde(rename = "matriculados", default, deserialize_with = "lenient_number")]
    pub matriculated: f64,
    #[serde(rename = "conseguidos", default, deserialize_with = "lenient_number")]
    pub approved: f64,
}

/// Source of plan snapshots for a candidate identification.
#[async_trait]
pub trait AcademicRecordSource: Send + Sync {
    async fn plans_for(
        &self,
        identification: &str,
    ) -> Result<Vec<AcademicPlanSnapshot>, AcademicRecordError>;
}

/// Integration failures from the academic-records service.
#[derive(Debug, thiserror::Error)]
pub enum AcademicRecordError {
    #[error("academic service timed out for '{identification}'")]
    Timeout { identification: String },
    #[error("academic service request failed: {0}")]
    Request(String),
    #[error("academic service answered {status} for '{identification}'")]
    Status { identification: String, status: u16 },
    #[error("academic service returned a malformed payload: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

impl NumberLike {
    fn into_number(self) -> Option<f64> {
        match self {
            NumberLike::Number(value) => Some(value),
            NumberLike::Text(raw) => raw.trim().replace(',', ".").parse().ok(),
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_number(deserializer)?.unwrap_or_default())
}

fn lenient_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(value.and_then(NumberLike::into_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_accepts_numeric_strings_and_typology_breakdown() {
        let plan: AcademicPlanSnapshot = serde_json::from_value(json!({
            "cod_plan": "AE02",
            "plan": "Administración de Empresas",
            "creditos_matriculados": "12",
            "creditos_conseguidos": 80,
            "creditos_totales": 160,
            "promedio_acumulado": "4,1",
            "tipologias": {
                "b": { "matriculados": 3, "conseguidos": "30" }
            },
            "graduado": false
        }))
        .expect("snapshot parses");

        assert_eq!(plan.credits_matriculated, 12.0);
        assert_eq!(plan.credits_approved, 80.0);
        assert_eq!(plan.cumulative_average, Some(4.1));
        assert_eq!(plan.semester_by_credits, None);
        assert_eq!(plan.typology("B").map(|credits| credits.approved), Some(30.0));
        assert!(plan.is_program(" ae02 "));
    }
}
