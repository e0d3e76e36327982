use super::super::domain::{AttributeValue, LeadRecord};
use super::rule::{ConditionOperator, ConditionValue, RoutingCondition, RoutingRule};

/// Test one condition against a record. Missing fields never match.
///
/// String comparisons (`equals`, `contains`, `in`) trim and ignore case.
pub fn evaluate_condition(condition: &RoutingCondition, record: &LeadRecord) -> bool {
    let Some(actual) = record.attribute(&condition.field) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => match &condition.value {
            ConditionValue::Single(expected) => text_equals(actual, expected),
            ConditionValue::List(_) => false,
        },
        ConditionOperator::Contains => match &condition.value {
            ConditionValue::Single(expected) => {
                let needle = normalized(expected);
                !needle.is_empty() && normalized(actual).contains(&needle)
            }
            ConditionValue::List(_) => false,
        },
        ConditionOperator::GreaterThan => {
            compare_numbers(actual, &condition.value, |field, value| field > value)
        }
        ConditionOperator::LessThan => {
            compare_numbers(actual, &condition.value, |field, value| field < value)
        }
        ConditionOperator::In => candidates(&condition.value)
            .iter()
            .any(|candidate| normalized(actual) == *candidate),
    }
}

/// All conditions must hold. A rule without conditions never matches.
pub fn rule_matches(rule: &RoutingRule, record: &LeadRecord) -> bool {
    !rule.conditions.is_empty()
        && rule
            .conditions
            .iter()
            .all(|condition| evaluate_condition(condition, record))
}

fn normalized(value: &AttributeValue) -> String {
    value.to_string().trim().to_lowercase()
}

fn text_equals(actual: &AttributeValue, expected: &AttributeValue) -> bool {
    if let (Some(left), Some(right)) = (actual.as_number(), expected.as_number()) {
        return left == right;
    }
    normalized(actual) == normalized(expected)
}

fn compare_numbers(
    actual: &AttributeValue,
    value: &ConditionValue,
    cmp: impl Fn(f64, f64) -> bool,
) -> bool {
    let ConditionValue::Single(expected) = value else {
        return false;
    };
    match (actual.as_number(), expected.as_number()) {
        (Some(field), Some(threshold)) => cmp(field, threshold),
        _ => false,
    }
}

/// Candidates for `in`: an explicit list, or a comma-separated string.
fn candidates(value: &ConditionValue) -> Vec<String> {
    match value {
        ConditionValue::List(values) => values.iter().map(normalized).collect(),
        ConditionValue::Single(AttributeValue::Text(raw)) => raw
            .split(',')
            .map(|candidate| candidate.trim().to_lowercase())
            .filter(|candidate| !candidate.is_empty())
            .collect(),
        ConditionValue::Single(other) => vec![normalized(other)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LeadRecord {
        LeadRecord::new("lead-1")
            .with_attribute("state", "CA")
            .with_attribute("industry", "Technology")
            .with_attribute("company", "Acme Robotics Inc")
            .with_attribute("budget", 75000.0)
            .with_attribute("employees", "250")
    }

    #[test]
    fn equals_is_case_insensitive() {
        let condition = RoutingCondition::new("state", ConditionOperator::Equals, "ca");
        assert!(evaluate_condition(&condition, &record()));
        let condition = RoutingCondition::new("state", ConditionOperator::Equals, " CA ");
        assert!(evaluate_condition(&condition, &record()));
        let condition = RoutingCondition::new("state", ConditionOperator::Equals, "NY");
        assert!(!evaluate_condition(&condition, &record()));
    }

    #[test]
    fn equals_compares_numbers_numerically() {
        let condition = RoutingCondition::new("budget", ConditionOperator::Equals, "75000.0");
        assert!(evaluate_condition(&condition, &record()));
    }

    #[test]
    fn contains_tests_substring_of_stringified_value() {
        let condition = RoutingCondition::new("company", ConditionOperator::Contains, "robotics");
        assert!(evaluate_condition(&condition, &record()));
        let condition = RoutingCondition::new("budget", ConditionOperator::Contains, "750");
        assert!(evaluate_condition(&condition, &record()));
        let condition = RoutingCondition::new("company", ConditionOperator::Contains, "");
        assert!(!evaluate_condition(&condition, &record()));
    }

    #[test]
    fn numeric_comparisons_never_match_non_numbers() {
        let gt = RoutingCondition::new("budget", ConditionOperator::GreaterThan, 50000.0);
        let lt = RoutingCondition::new("employees", ConditionOperator::LessThan, 500.0);
        assert!(evaluate_condition(&gt, &record()));
        assert!(evaluate_condition(&lt, &record()));

        let text_field = RoutingCondition::new("industry", ConditionOperator::GreaterThan, 1.0);
        let text_value = RoutingCondition::new("budget", ConditionOperator::LessThan, "lots");
        assert!(!evaluate_condition(&text_field, &record()));
        assert!(!evaluate_condition(&text_value, &record()));
    }

    #[test]
    fn in_accepts_lists_and_csv() {
        let list = RoutingCondition::new("state", ConditionOperator::In, vec!["OR", "ca", "WA"]);
        let csv = RoutingCondition::new("state", ConditionOperator::In, "OR, CA ,WA");
        let miss = RoutingCondition::new("state", ConditionOperator::In, "NY,NJ");
        assert!(evaluate_condition(&list, &record()));
        assert!(evaluate_condition(&csv, &record()));
        assert!(!evaluate_condition(&miss, &record()));
    }

    #[test]
    fn missing_field_never_matches() {
        let condition = RoutingCondition::new("region", ConditionOperator::Equals, "west");
        assert!(!evaluate_condition(&condition, &record()));
    }

    #[test]
    fn rule_requires_every_condition_and_at_least_one() {
        use super::super::rule::AssignTarget;

        let empty = RoutingRule::new("empty", "Empty", 1, AssignTarget::owner("alice"));
        assert!(!rule_matches(&empty, &record()));

        let both = RoutingRule::new("both", "Both", 1, AssignTarget::owner("alice"))
            .with_condition(RoutingCondition::new("state", ConditionOperator::Equals, "CA"))
            .with_condition(RoutingCondition::new(
                "industry",
                ConditionOperator::Equals,
                "Retail",
            ));
        assert!(!rule_matches(&both, &record()));
    }
}
