use std::fmt;

use serde::{Deserialize, Serialize};

use crate::workflows::academic::AcademicPlanSnapshot;

/// Credit typologies broken out on every plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Typology {
    B,
    C,
    L,
    O,
}

impl Typology {
    pub const ALL: [Typology; 4] = [Typology::B, Typology::C, Typology::L, Typology::O];

    pub const fn code(self) -> &'static str {
        match self {
            Typology::B => "B",
            Typology::C => "C",
            Typology::L => "L",
            Typology::O => "O",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|typology| typology.code().eq_ignore_ascii_case(code))
    }
}

/// Variables a rule condition can reference.
///
/// Stored rules may still carry names this build does not know; those deserialize into
/// `Unknown` and always extract to "not available".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleVariable {
    CreditsMatriculated,
    CreditsApproved,
    CreditsTotal,
    PercentageApproved,
    PercentageTaken,
    CumulativeAverage,
    SemesterByCredits,
    TypologyMatriculated(Typology),
    TypologyApproved(Typology),
    Unknown(String),
}

const MATRICULATED_PREFIX: &str = "creditosMatriculados";
const APPROVED_PREFIX: &str = "creditosAprobados";

impl RuleVariable {
    /// Every variable in the registry, in documentation order.
    pub fn known() -> Vec<RuleVariable> {
        let mut variables = vec![
            RuleVariable::CreditsMatriculated,
            RuleVariable::CreditsApproved,
            RuleVariable::CreditsTotal,
            RuleVariable::PercentageApproved,
            RuleVariable::PercentageTaken,
            RuleVariable::CumulativeAverage,
            RuleVariable::SemesterByCredits,
        ];
        for typology in Typology::ALL {
            variables.push(RuleVariable::TypologyMatriculated(typology));
            variables.push(RuleVariable::TypologyApproved(typology));
        }
        variables
    }

    pub fn lookup(name: &str) -> Option<RuleVariable> {
        let name = name.trim();
        let simple = match name {
            "creditosMatriculados" => Some(RuleVariable::CreditsMatriculated),
            "creditosAprobados" => Some(RuleVariable::CreditsApproved),
            "creditosTotales" => Some(RuleVariable::CreditsTotal),
            "porcentajeAprobado" => Some(RuleVariable::PercentageApproved),
            "porcentajeCursado" => Some(RuleVariable::PercentageTaken),
            "promedioAcumulado" => Some(RuleVariable::CumulativeAverage),
            "semestrePorCreditos" => Some(RuleVariable::SemesterByCredits),
            _ => None,
        };
        if simple.is_some() {
            return simple;
        }

        if let Some(code) = name.strip_prefix(MATRICULATED_PREFIX) {
            return Typology::from_code(code).map(RuleVariable::TypologyMatriculated);
        }
        if let Some(code) = name.strip_prefix(APPROVED_PREFIX) {
            return Typology::from_code(code).map(RuleVariable::TypologyApproved);
        }
        None
    }

    pub fn name(&self) -> String {
        match self {
            RuleVariable::CreditsMatriculated => MATRICULATED_PREFIX.to_string(),
            RuleVariable::CreditsApproved => APPROVED_PREFIX.to_string(),
            RuleVariable::CreditsTotal => "creditosTotales".to_string(),
            RuleVariable::PercentageApproved => "porcentajeAprobado".to_string(),
            RuleVariable::PercentageTaken => "porcentajeCursado".to_string(),
            RuleVariable::CumulativeAverage => "promedioAcumulado".to_string(),
            RuleVariable::SemesterByCredits => "semestrePorCreditos".to_string(),
            RuleVariable::TypologyMatriculated(typology) => {
                format!("{MATRICULATED_PREFIX}{}", typology.code())
            }
            RuleVariable::TypologyApproved(typology) => {
                format!("{APPROVED_PREFIX}{}", typology.code())
            }
            RuleVariable::Unknown(name) => name.clone(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, RuleVariable::Unknown(_))
    }

    /// Extract the variable from a plan; `None` means "not available".
    pub fn extract(&self, plan: &AcademicPlanSnapshot) -> Option<f64> {
        match self {
            RuleVariable::CreditsMatriculated => Some(plan.credits_matriculated),
            RuleVariable::CreditsApproved => Some(plan.credits_approved),
            RuleVariable::CreditsTotal => Some(plan.credits_total),
            RuleVariable::PercentageApproved => percentage(plan.credits_approved, plan.credits_total),
            RuleVariable::PercentageTaken => percentage(
                plan.credits_approved + plan.credits_matriculated,
                plan.credits_total,
            ),
            RuleVariable::CumulativeAverage => plan.cumulative_average,
            RuleVariable::SemesterByCredits => plan.semester_by_credits,
            RuleVariable::TypologyMatriculated(typology) => plan
                .typology(typology.code())
                .map(|credits| credits.matriculated),
            RuleVariable::TypologyApproved(typology) => plan
                .typology(typology.code())
                .map(|credits| credits.approved),
            RuleVariable::Unknown(_) => None,
        }
    }
}

/// Resolve `name` through the registry and extract it; unknown names are not available.
pub fn extract_named(name: &str, plan: &AcademicPlanSnapshot) -> Option<f64> {
    RuleVariable::lookup(name).and_then(|variable| variable.extract(plan))
}

fn percentage(part: f64, total: f64) -> Option<f64> {
    (total > 0.0).then(|| part / total * 100.0)
}

impl From<String> for RuleVariable {
    fn from(value: String) -> Self {
        RuleVariable::lookup(&value).unwrap_or(RuleVariable::Unknown(value))
    }
}

impl From<RuleVariable> for String {
    fn from(value: RuleVariable) -> Self {
        value.name()
    }
}

impl fmt::Display for RuleVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::academic::TypologyCredits;
    use std::collections::BTreeMap;

    fn plan() -> AcademicPlanSnapshot {
        let mut typologies = BTreeMap::new();
        typologies.insert(
            "C".to_string(),
            TypologyCredits {
                matriculated: 6.0,
                approved: 42.0,
            },
        );

        AcademicPlanSnapshot {
            program_code: "AE02".to_string(),
            program_name: "Administración".to_string(),
            faculty_code: None,
            faculty_name: None,
            credits_matriculated: 20.0,
            credits_approved: 80.0,
            credits_total: 160.0,
            typologies,
            cumulative_average: Some(3.9),
            semester_by_credits: None,
            graduated: false,
            graduation_date: None,
            education_level: None,
            matriculation_code: None,
        }
    }

    #[test]
    fn registry_round_trips_every_known_name() {
        for variable in RuleVariable::known() {
            assert_eq!(RuleVariable::lookup(&variable.name()), Some(variable.clone()));
        }
        assert_eq!(RuleVariable::known().len(), 15);
    }

    #[test]
    fn derived_percentages_use_total_credits() {
        let plan = plan();
        assert_eq!(extract_named("porcentajeAprobado", &plan), Some(50.0));
        assert_eq!(extract_named("porcentajeCursado", &plan), Some(62.5));

        let mut empty = plan.clone();
        empty.credits_total = 0.0;
        assert_eq!(extract_named("porcentajeAprobado", &empty), None);
    }

    #[test]
    fn typology_variables_read_nested_breakdown() {
        let plan = plan();
        assert_eq!(extract_named("creditosAprobadosC", &plan), Some(42.0));
        assert_eq!(extract_named("creditosMatriculadosC", &plan), Some(6.0));
        assert_eq!(extract_named("creditosAprobadosB", &plan), None);
    }

    #[test]
    fn unknown_names_are_not_available() {
        let plan = plan();
        assert_eq!(extract_named("creditosInventados", &plan), None);
        assert_eq!(extract_named("creditosAprobadosZ", &plan), None);

        let variable: RuleVariable =
            serde_json::from_str("\"edadCandidato\"").expect("unknown names still deserialize");
        assert!(!variable.is_known());
        assert_eq!(variable.extract(&plan), None);
    }
}
