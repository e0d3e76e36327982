use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::leads::domain::{LeadId, LeadRecord, LifecycleStage};
use crate::workflows::leads::qualification::{
    Criterion, ResponseValue, Responses, Step, Workflow, WorkflowCatalog,
};
use crate::workflows::leads::repository::{LeadRepository, RepositoryError};
use crate::workflows::leads::routing::{
    AssignTarget, Assigner, AssignmentState, ConditionOperator, Roster, RoutingCondition,
    RoutingEngine, RoutingRule, RuleBook, TerritoryTable,
};
use crate::workflows::leads::service::LeadService;

pub(super) fn responses(entries: &[(&str, ResponseValue)]) -> Responses {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), value.clone()))
        .collect()
}

/// Step of `total` boolean criteria, all required.
pub(super) fn boolean_step(id: &str, total: usize, weight: f64, passing_score: f64) -> Step {
    Step {
        id: id.to_string(),
        name: id.to_uppercase(),
        criteria: (0..total)
            .map(|index| Criterion::boolean(&format!("{id}_{index}"), "Confirmed?", true))
            .collect(),
        weight,
        passing_score,
    }
}

/// Answer the first `yes` criteria of a boolean step with true and the rest with false.
pub(super) fn answer_step(step: &Step, yes: usize, responses: &mut Responses) {
    for (index, criterion) in step.criteria.iter().enumerate() {
        responses.insert(criterion.id.clone(), ResponseValue::Boolean(index < yes));
    }
}

pub(super) fn workflow(steps: Vec<Step>, threshold: f64) -> Workflow {
    Workflow {
        id: "test".to_string(),
        name: "Test".to_string(),
        steps,
        qualification_threshold: threshold,
        next_stage_on_pass: LifecycleStage::Qualified,
        next_stage_on_fail: LifecycleStage::Nurturing,
    }
}

pub(super) fn ca_tech_record(id: &str) -> LeadRecord {
    LeadRecord::new(id)
        .with_attribute("state", "CA")
        .with_attribute("industry", "Technology")
        .with_attribute("region", "west")
        .with_attribute("budget", 120000.0)
}

pub(super) fn state_rule(id: &str, priority: i32, state: &str, owner: &str) -> RoutingRule {
    RoutingRule::new(id, id, priority, AssignTarget::owner(owner)).with_condition(
        RoutingCondition::new("state", ConditionOperator::Equals, state),
    )
}

pub(super) fn industry_rule(id: &str, priority: i32, industry: &str, owner: &str) -> RoutingRule {
    RoutingRule::new(id, id, priority, AssignTarget::owner(owner)).with_condition(
        RoutingCondition::new("industry", ConditionOperator::Equals, industry),
    )
}

pub(super) fn sales_roster() -> Roster {
    Roster::new("sales", &["alice", "bob", "carol"])
}

pub(super) fn territories() -> TerritoryTable {
    TerritoryTable::new("region")
        .with_entry("west", "dana")
        .with_entry("northeast", "eli")
}

pub(super) fn assigner() -> Arc<Assigner> {
    Arc::new(
        Assigner::new(Arc::new(AssignmentState::new()), territories())
            .with_roster(sales_roster())
            .with_roster(Roster::new("empty", &[])),
    )
}

pub(super) fn routing_engine(rules: Vec<RoutingRule>) -> RoutingEngine {
    let book = RuleBook::new(rules).expect("rules valid");
    RoutingEngine::new(Arc::new(book), assigner())
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    records: Arc<Mutex<HashMap<LeadId, LeadRecord>>>,
}

impl LeadRepository for MemoryRepository {
    fn insert(&self, record: LeadRecord) -> Result<LeadRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: LeadRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl LeadRepository for UnavailableRepository {
    fn insert(&self, _record: LeadRecord) -> Result<LeadRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn update(&self, _record: LeadRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _id: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) fn default_rules() -> Vec<RoutingRule> {
    vec![
        state_rule("ca", 1, "CA", "alice"),
        industry_rule("tech", 2, "Technology", "bob"),
        RoutingRule::new(
            "enterprise",
            "Enterprise budget",
            3,
            AssignTarget::strategy("load_balancing", "sales"),
        )
        .with_condition(RoutingCondition::new(
            "budget",
            ConditionOperator::GreaterThan,
            100000.0,
        )),
    ]
}

pub(super) fn build_service() -> (LeadService<MemoryRepository>, MemoryRepository) {
    let repository = MemoryRepository::default();
    let service = LeadService::new(
        Arc::new(repository.clone()),
        Arc::new(WorkflowCatalog::standard()),
        routing_engine(default_rules()),
    );
    (service, repository)
}

pub(super) fn bant_responses(strong: bool) -> Responses {
    if strong {
        responses(&[
            ("has_budget", true.into()),
            ("budget_range", "$100K+".into()),
            ("budget_notes", "Approved for FY budget".into()),
            ("is_decision_maker", true.into()),
            ("decision_process", "CFO countersigns".into()),
            ("priority", "Critical".into()),
            ("pain_points", "Manual quote approvals".into()),
            ("timeline", "Immediately".into()),
            ("compelling_event", true.into()),
        ])
    } else {
        responses(&[
            ("has_budget", false.into()),
            ("budget_range", "Under $10K".into()),
            ("is_decision_maker", false.into()),
            ("priority", "Nice to Have".into()),
            ("pain_points", "Curious".into()),
            ("timeline", "No timeline".into()),
        ])
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("valid json")
}
