use super::definition::{format_number, ConditionOperator, ExpectedValue, RuleCondition};
use super::ConditionDetail;
use crate::workflows::academic::AcademicPlanSnapshot;

const TOLERANCE: f64 = 1e-9;

pub(crate) fn evaluate_condition(
    condition: &RuleCondition,
    plan: &AcademicPlanSnapshot,
) -> ConditionDetail {
    let actual = condition.variable.extract(plan);
    let passed = actual
        .map(|value| compare(condition.operator, value, &condition.expected))
        .unwrap_or(false);

    ConditionDetail {
        variable: condition.variable.name(),
        operator: condition.operator,
        expected: condition.expected.clone(),
        actual,
        passed,
    }
}

fn compare(operator: ConditionOperator, actual: f64, expected: &ExpectedValue) -> bool {
    if operator == ConditionOperator::Contains {
        let haystack = format_number(actual).to_lowercase();
        let needle = expected.to_string().trim().to_lowercase();
        return haystack.contains(&needle);
    }

    let Some(expected) = expected.as_number() else {
        return false;
    };

    match operator {
        ConditionOperator::AtLeast => actual >= expected - TOLERANCE,
        ConditionOperator::AtMost => actual <= expected + TOLERANCE,
        ConditionOperator::Equals => (actual - expected).abs() <= TOLERANCE,
        ConditionOperator::NotEquals => (actual - expected).abs() > TOLERANCE,
        ConditionOperator::Contains | ConditionOperator::Unsupported => false,
    }
}
