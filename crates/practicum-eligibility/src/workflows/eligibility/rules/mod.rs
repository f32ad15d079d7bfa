mod conditions;
mod definition;
pub mod variables;

pub use definition::{
    ConditionDraft, ConditionOperator, EligibilityRule, ExpectedValue, LogicOperator,
    RuleCondition, RuleDraft, RuleValidationError,
};
pub use variables::{RuleVariable, Typology};

use serde::{Deserialize, Serialize};

use super::domain::{EligibilityStatus, RuleId};
use crate::workflows::academic::AcademicPlanSnapshot;
use conditions::evaluate_condition;

/// Diagnostic trail for a single condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDetail {
    pub variable: String,
    pub operator: ConditionOperator,
    pub expected: ExpectedValue,
    pub actual: Option<f64>,
    pub passed: bool,
}

/// Result of one rule against the candidate's plan for the requested program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEvaluationResult {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub logic: LogicOperator,
    pub passed: bool,
    pub conditions: Vec<ConditionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every rule's result plus the status derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetEvaluation {
    pub status: EligibilityStatus,
    pub results: Vec<RuleEvaluationResult>,
}

/// Stateless evaluator applying configured rules to plan snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        rule: &EligibilityRule,
        plans: &[AcademicPlanSnapshot],
        program_code: &str,
    ) -> RuleEvaluationResult {
        let Some(plan) = plans.iter().find(|plan| plan.is_program(program_code)) else {
            return RuleEvaluationResult {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                logic: rule.logic,
                passed: false,
                conditions: Vec::new(),
                error: Some(format!("plan not found for program '{program_code}'")),
            };
        };

        let conditions: Vec<ConditionDetail> = rule
            .conditions
            .iter()
            .map(|condition| evaluate_condition(condition, plan))
            .collect();

        let passed = conditions.is_empty()
            || match rule.logic {
                LogicOperator::And => conditions.iter().all(|detail| detail.passed),
                LogicOperator::Or => conditions.iter().any(|detail| detail.passed),
            };

        RuleEvaluationResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            logic: rule.logic,
            passed,
            conditions,
            error: None,
        }
    }

    /// Evaluate every rule in order, without short-circuiting, and derive the status.
    pub fn evaluate_all(
        &self,
        rules: &[EligibilityRule],
        plans: &[AcademicPlanSnapshot],
        program_code: &str,
    ) -> RuleSetEvaluation {
        let results: Vec<RuleEvaluationResult> = rules
            .iter()
            .map(|rule| self.evaluate(rule, plans, program_code))
            .collect();

        let status = if results.is_empty() {
            EligibilityStatus::InReview
        } else if results.iter().all(|result| result.passed) {
            EligibilityStatus::Authorized
        } else {
            EligibilityStatus::NotAuthorized
        };

        RuleSetEvaluation { status, results }
    }
}
