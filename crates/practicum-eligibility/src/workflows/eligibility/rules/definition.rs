use std::fmt;

use serde::{Deserialize, Serialize};

use super::variables::RuleVariable;
use crate::workflows::eligibility::domain::RuleId;

/// How a rule combines its conditions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOperator {
    #[default]
    And,
    Or,
}

/// Comparison applied between the extracted variable and the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "=")]
    Equals,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "contains")]
    Contains,
    /// Operator names this build does not recognize; conditions using it always fail.
    #[serde(other)]
    Unsupported,
}

impl ConditionOperator {
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim().to_ascii_lowercase().as_str() {
            ">=" => Some(Self::AtLeast),
            "<=" => Some(Self::AtMost),
            "=" | "==" => Some(Self::Equals),
            "!=" | "<>" => Some(Self::NotEquals),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            ConditionOperator::AtLeast => ">=",
            ConditionOperator::AtMost => "<=",
            ConditionOperator::Equals => "=",
            ConditionOperator::NotEquals => "!=",
            ConditionOperator::Contains => "contains",
            ConditionOperator::Unsupported => "unsupported",
        }
    }

    pub const fn is_numeric(self) -> bool {
        !matches!(
            self,
            ConditionOperator::Contains | ConditionOperator::Unsupported
        )
    }
}

/// Expected operand of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Number(f64),
    Text(String),
}

impl ExpectedValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ExpectedValue::Number(value) => Some(*value),
            ExpectedValue::Text(raw) => raw.trim().replace(',', ".").parse().ok(),
        }
    }
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedValue::Number(value) => f.write_str(&format_number(*value)),
            ExpectedValue::Text(text) => f.write_str(text),
        }
    }
}

/// Render numbers the way they are written in rules: `80`, not `80.0`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub variable: RuleVariable,
    pub operator: ConditionOperator,
    #[serde(rename = "expectedValue")]
    pub expected: ExpectedValue,
}

/// Admin-managed eligibility rule, read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub id: RuleId,
    pub name: String,
    /// Programs the rule applies to; empty means every program.
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub logic: LogicOperator,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub period_id: String,
}

fn default_active() -> bool {
    true
}

impl EligibilityRule {
    /// Active, owned by `period_id`, and either global or listing `program_code`.
    pub fn applies_to(&self, program_code: &str, period_id: &str) -> bool {
        self.active
            && self.period_id.trim() == period_id.trim()
            && (self.programs.is_empty()
                || self
                    .programs
                    .iter()
                    .any(|program| program.trim().eq_ignore_ascii_case(program_code.trim())))
    }
}

/// Rule as typed by an administrator, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleDraft {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub logic: Option<String>,
    #[serde(default)]
    pub conditions: Vec<ConditionDraft>,
    #[serde(default = "default_active")]
    pub active: bool,
    pub period_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionDraft {
    pub variable: String,
    pub operator: String,
    #[serde(rename = "expectedValue")]
    pub expected: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleValidationError {
    #[error("rule id and name are required")]
    MissingName,
    #[error("rule '{rule}' has no owning period")]
    MissingPeriod { rule: String },
    #[error("rule '{rule}' uses unknown logic '{logic}'")]
    UnknownLogic { rule: String, logic: String },
    #[error("rule '{rule}' condition {index} references unknown variable '{variable}'")]
    UnknownVariable {
        rule: String,
        index: usize,
        variable: String,
    },
    #[error("rule '{rule}' condition {index} uses unknown operator '{operator}'")]
    UnknownOperator {
        rule: String,
        index: usize,
        operator: String,
    },
    #[error("rule '{rule}' condition {index} needs a numeric expected value for '{operator}'")]
    NonNumericExpectation {
        rule: String,
        index: usize,
        operator: &'static str,
    },
}

impl TryFrom<RuleDraft> for EligibilityRule {
    type Error = RuleValidationError;

    fn try_from(draft: RuleDraft) -> Result<Self, Self::Error> {
        let name = draft.name.trim().to_string();
        if name.is_empty() || draft.id.trim().is_empty() {
            return Err(RuleValidationError::MissingName);
        }
        if draft.period_id.trim().is_empty() {
            return Err(RuleValidationError::MissingPeriod { rule: name });
        }

        let logic = match draft.logic.as_deref().map(str::trim) {
            None | Some("") => LogicOperator::And,
            Some(raw) if raw.eq_ignore_ascii_case("and") => LogicOperator::And,
            Some(raw) if raw.eq_ignore_ascii_case("or") => LogicOperator::Or,
            Some(raw) => {
                return Err(RuleValidationError::UnknownLogic {
                    rule: name,
                    logic: raw.to_string(),
                })
            }
        };

        let mut conditions = Vec::with_capacity(draft.conditions.len());
        for (index, condition) in draft.conditions.into_iter().enumerate() {
            conditions.push(validate_condition(&name, index, condition)?);
        }

        Ok(EligibilityRule {
            id: RuleId(draft.id.trim().to_string()),
            name,
            programs: draft
                .programs
                .into_iter()
                .map(|program| program.trim().to_string())
                .filter(|program| !program.is_empty())
                .collect(),
            logic,
            conditions,
            active: draft.active,
            period_id: draft.period_id.trim().to_string(),
        })
    }
}

fn validate_condition(
    rule: &str,
    index: usize,
    draft: ConditionDraft,
) -> Result<RuleCondition, RuleValidationError> {
    let variable = RuleVariable::lookup(&draft.variable).ok_or_else(|| {
        RuleValidationError::UnknownVariable {
            rule: rule.to_string(),
            index,
            variable: draft.variable.clone(),
        }
    })?;

    let operator = ConditionOperator::parse(&draft.operator).ok_or_else(|| {
        RuleValidationError::UnknownOperator {
            rule: rule.to_string(),
            index,
            operator: draft.operator.clone(),
        }
    })?;

    let expected = match draft.expected {
        serde_json::Value::Number(number) => number
            .as_f64()
            .map(ExpectedValue::Number)
            .unwrap_or_else(|| ExpectedValue::Text(number.to_string())),
        serde_json::Value::String(text) => ExpectedValue::Text(text),
        other => ExpectedValue::Text(other.to_string()),
    };

    if operator.is_numeric() && expected.as_number().is_none() {
        return Err(RuleValidationError::NonNumericExpectation {
            rule: rule.to_string(),
            index,
            operator: operator.symbol(),
        });
    }

    Ok(RuleCondition {
        variable,
        operator,
        expected,
    })
}
