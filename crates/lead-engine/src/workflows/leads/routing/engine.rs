use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::super::domain::LeadRecord;
use super::assignment::{Assigner, Assignment};
use super::condition::rule_matches;
use super::rule::RoutingRule;
use super::rulebook::RuleBook;
use super::RoutingError;

/// Rule chosen for a record, before assignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSelection<'a> {
    pub rule: &'a RoutingRule,
    pub via_default: bool,
}

/// Pick the first active rule, by ascending priority then definition order, whose
/// conditions all hold. Falls back to the first active catch-all rule.
pub fn select_rule<'a>(record: &LeadRecord, rules: &'a [RoutingRule]) -> Option<RuleSelection<'a>> {
    let mut ordered: Vec<&RoutingRule> = rules.iter().filter(|rule| rule.is_active).collect();
    ordered.sort_by_key(|rule| rule.priority);

    if let Some(rule) = ordered
        .iter()
        .copied()
        .filter(|rule| !rule.is_default)
        .find(|rule| rule_matches(rule, record))
    {
        return Some(RuleSelection {
            rule,
            via_default: false,
        });
    }

    ordered
        .into_iter()
        .find(|rule| rule.is_default)
        .map(|rule| RuleSelection {
            rule,
            via_default: true,
        })
}

/// Outcome of routing one record. `matched: false` is an ordinary result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_name: Option<String>,
    #[serde(default)]
    pub via_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Assignment>,
    /// Match count of the chosen rule after this decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<u64>,
}

impl RoutingDecision {
    pub fn unmatched() -> Self {
        Self {
            matched: false,
            rule_id: None,
            rule_name: None,
            via_default: false,
            assign_to: None,
            assignment: None,
            match_count: None,
        }
    }
}

/// Evaluates the shared rule book and delegates strategy targets to the assigner.
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    rules: Arc<RuleBook>,
    assigner: Arc<Assigner>,
}

impl RoutingEngine {
    pub fn new(rules: Arc<RuleBook>, assigner: Arc<Assigner>) -> Self {
        Self { rules, assigner }
    }

    pub fn rules(&self) -> &Arc<RuleBook> {
        &self.rules
    }

    pub fn assigner(&self) -> &Arc<Assigner> {
        &self.assigner
    }

    /// Route against a snapshot of the rule book taken on entry.
    ///
    /// The match is counted before assignment runs, so an assignment failure still
    /// leaves the rule's match recorded.
    pub fn route_record(&self, record: &LeadRecord) -> Result<RoutingDecision, RoutingError> {
        let snapshot = self.rules.snapshot();

        let Some(selection) = select_rule(record, &snapshot.rules) else {
            info!(record = %record.id, "no routing rule matched");
            return Ok(RoutingDecision::unmatched());
        };
        let rule = selection.rule;

        let match_count = self.rules.record_match(snapshot.version, &rule.id)?;
        let assignment = self.assigner.resolve(&rule.assign_to, record)?;

        if selection.via_default {
            debug!(record = %record.id, rule = %rule.id, "routed through catch-all rule");
        }
        info!(
            record = %record.id,
            rule = %rule.id,
            assignee = %assignment.assignee,
            match_count,
            "routing rule matched"
        );

        Ok(RoutingDecision {
            matched: true,
            rule_id: Some(rule.id.clone()),
            rule_name: Some(rule.name.clone()),
            via_default: selection.via_default,
            assign_to: Some(assignment.assignee.clone()),
            assignment: Some(assignment),
            match_count: Some(match_count),
        })
    }
}
