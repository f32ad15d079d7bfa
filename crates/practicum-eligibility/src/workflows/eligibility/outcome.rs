use serde::{Deserialize, Serialize};

/// Error recorded for one failed batch item, keyed by identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub identification: String,
    pub message: String,
}

impl ItemError {
    pub fn new(identification: impl Into<String>, message: impl ToString) -> Self {
        Self {
            identification: identification.into(),
            message: message.to_string(),
        }
    }
}

/// Typed outcome of processing one batch item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<T> {
    Ok(T),
    Failed(ItemError),
}

impl<T> ItemOutcome<T> {
    pub fn from_result<E: ToString>(identification: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(value) => ItemOutcome::Ok(value),
            Err(error) => ItemOutcome::Failed(ItemError::new(identification, error)),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ItemOutcome::Ok(value) => Some(value),
            ItemOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ItemError> {
        match self {
            ItemOutcome::Ok(_) => None,
            ItemOutcome::Failed(error) => Some(error),
        }
    }
}

/// Count the successful outcomes matching `predicate`.
pub fn count_ok<T>(outcomes: &[ItemOutcome<T>], predicate: impl Fn(&T) -> bool) -> usize {
    outcomes
        .iter()
        .filter_map(ItemOutcome::value)
        .filter(|value| predicate(value))
        .count()
}

pub fn collect_errors<T>(outcomes: &[ItemOutcome<T>]) -> Vec<ItemError> {
    outcomes
        .iter()
        .filter_map(ItemOutcome::error)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_derived_from_the_outcome_list() {
        let outcomes = vec![
            ItemOutcome::from_result::<String>("1", Ok(true)),
            ItemOutcome::from_result("2", Err("boom")),
            ItemOutcome::from_result::<String>("3", Ok(false)),
        ];

        assert_eq!(count_ok(&outcomes, |created| *created), 1);
        assert_eq!(count_ok(&outcomes, |created| !*created), 1);
        assert_eq!(
            collect_errors(&outcomes),
            vec![ItemError::new("2", "boom")]
        );
    }
}
