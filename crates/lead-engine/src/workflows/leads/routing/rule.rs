use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::super::domain::AttributeValue;
use super::super::qualification::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
    In,
}

/// Comparison operand: a single value, or a candidate list for `in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    List(Vec<AttributeValue>),
    Single(AttributeValue),
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        ConditionValue::Single(AttributeValue::from(value))
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        ConditionValue::Single(AttributeValue::Number(value))
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(values: Vec<&str>) -> Self {
        ConditionValue::List(values.into_iter().map(AttributeValue::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingCondition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
    /// Carried for configuration compatibility; matching is pure AND and ignores it.
    #[serde(default)]
    pub weight: Option<f64>,
}

impl RoutingCondition {
    pub fn new(field: &str, operator: ConditionOperator, value: impl Into<ConditionValue>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: value.into(),
            weight: None,
        }
    }
}

/// Who a matched rule hands the record to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignTarget {
    /// Literal owner, returned unchanged.
    Owner(String),
    /// Strategy key resolved against a named roster.
    Strategy { key: String, roster: String },
}

impl AssignTarget {
    pub fn owner(name: &str) -> Self {
        AssignTarget::Owner(name.to_string())
    }

    pub fn strategy(key: &str, roster: &str) -> Self {
        AssignTarget::Strategy {
            key: key.to_string(),
            roster: roster.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: String,
    pub name: String,
    /// Lower values are evaluated first.
    pub priority: i32,
    #[serde(default)]
    pub conditions: Vec<RoutingCondition>,
    pub assign_to: AssignTarget,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Catch-all rule used only when no other rule matches; its conditions are bypassed.
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub match_count: u64,
}

fn default_active() -> bool {
    true
}

impl RoutingRule {
    pub fn new(id: &str, name: &str, priority: i32, assign_to: AssignTarget) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            priority,
            conditions: Vec::new(),
            assign_to,
            is_active: true,
            is_default: false,
            match_count: 0,
        }
    }

    pub fn with_condition(mut self, condition: RoutingCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Catch-all rule evaluated after every other rule.
    pub fn catch_all(id: &str, name: &str, assign_to: AssignTarget) -> Self {
        let mut rule = Self::new(id, name, i32::MAX, assign_to);
        rule.is_default = true;
        rule
    }
}

pub(crate) fn validate_rules(rules: &[RoutingRule]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.id.trim().is_empty() {
            return Err(ValidationError::MissingRuleId);
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(ValidationError::DuplicateRule(rule.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_definitions_round_trip_from_json() {
        let rule: RoutingRule = serde_json::from_value(serde_json::json!({
            "id": "west",
            "name": "West coast",
            "priority": 1,
            "conditions": [
                { "field": "state", "operator": "in", "value": ["CA", "OR", "WA"] },
                { "field": "budget", "operator": "greater_than", "value": 10000, "weight": 0.5 }
            ],
            "assign_to": { "strategy": { "key": "round_robin", "roster": "west" } }
        }))
        .expect("rule parses");

        assert!(rule.is_active);
        assert!(!rule.is_default);
        assert_eq!(rule.match_count, 0);
        assert_eq!(rule.conditions[0].operator, ConditionOperator::In);
        assert!(matches!(rule.conditions[0].value, ConditionValue::List(_)));
        assert_eq!(rule.conditions[1].weight, Some(0.5));
        assert_eq!(rule.assign_to, AssignTarget::strategy("round_robin", "west"));
    }

    #[test]
    fn rejects_duplicate_rule_ids() {
        let rules = vec![
            RoutingRule::new("a", "A", 1, AssignTarget::owner("alice")),
            RoutingRule::new("a", "A again", 2, AssignTarget::owner("bob")),
        ];
        assert_eq!(
            validate_rules(&rules),
            Err(ValidationError::DuplicateRule("a".to_string()))
        );
    }
}
