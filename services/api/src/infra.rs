use lead_engine::config::AssignmentConfig;
use lead_engine::error::AppError;
use lead_engine::workflows::leads::routing::{ConditionOperator, RoutingCondition};
use lead_engine::workflows::leads::{
    AssignTarget, Assigner, AssignmentState, LeadId, LeadRecord, LeadRepository, LeadService,
    RepositoryError, Roster, RoutingEngine, RoutingRule, RuleBook, TerritoryTable,
    WorkflowCatalog,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Roster every built-in strategy rule draws from.
pub(crate) const DEFAULT_ROSTER: &str = "default";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLeadRepository {
    records: Arc<Mutex<HashMap<LeadId, LeadRecord>>>,
}

impl InMemoryLeadRepository {
    fn lock(&self) -> MutexGuard<'_, HashMap<LeadId, LeadRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LeadRepository for InMemoryLeadRepository {
    fn insert(&self, record: LeadRecord) -> Result<LeadRecord, RepositoryError> {
        let mut guard = self.lock();
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: LeadRecord) -> Result<(), RepositoryError> {
        let mut guard = self.lock();
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LeadId) -> Result<Option<LeadRecord>, RepositoryError> {
        let guard = self.lock();
        Ok(guard.get(id).cloned())
    }
}

/// Starter rule set: west-coast states go to territory owners, large budgets are
/// load balanced, and everything else rotates through the default roster.
pub(crate) fn default_routing_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule::new(
            "west_coast",
            "West coast territories",
            10,
            AssignTarget::strategy("territory", DEFAULT_ROSTER),
        )
        .with_condition(RoutingCondition::new(
            "state",
            ConditionOperator::In,
            "CA,OR,WA",
        )),
        RoutingRule::new(
            "enterprise",
            "Enterprise budgets",
            20,
            AssignTarget::strategy("load_balancing", DEFAULT_ROSTER),
        )
        .with_condition(RoutingCondition::new(
            "budget",
            ConditionOperator::GreaterThan,
            100_000.0,
        )),
        RoutingRule::catch_all(
            "everyone_else",
            "Default rotation",
            AssignTarget::strategy("round_robin", DEFAULT_ROSTER),
        ),
    ]
}

pub(crate) fn build_assigner(config: &AssignmentConfig) -> Result<Assigner, AppError> {
    let territories = match &config.territory_csv {
        Some(path) => {
            let table = TerritoryTable::from_path(path, &config.territory_field)?;
            info!(path = %path.display(), territories = table.len(), "territory table loaded");
            table
        }
        None => TerritoryTable::new(&config.territory_field),
    };

    if config.default_roster.is_empty() {
        warn!("LEAD_DEFAULT_ROSTER is empty; strategy rules will report no eligible assignee");
    }
    let members: Vec<&str> = config.default_roster.iter().map(String::as_str).collect();

    Ok(
        Assigner::new(Arc::new(AssignmentState::new()), territories)
            .with_roster(Roster::new(DEFAULT_ROSTER, &members)),
    )
}

pub(crate) fn build_lead_service(
    config: &AssignmentConfig,
    repository: Arc<InMemoryLeadRepository>,
) -> Result<LeadService<InMemoryLeadRepository>, AppError> {
    let assigner = build_assigner(config)?;
    let rules = RuleBook::new(default_routing_rules())?;

    Ok(LeadService::new(
        repository,
        Arc::new(WorkflowCatalog::standard()),
        RoutingEngine::new(Arc::new(rules), Arc::new(assigner)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_engine::config::DEFAULT_TERRITORY_FIELD;
    use std::io::Write;

    fn assignment_config(members: &[&str]) -> AssignmentConfig {
        AssignmentConfig {
            default_roster: members.iter().map(|member| member.to_string()).collect(),
            territory_csv: None,
            territory_field: DEFAULT_TERRITORY_FIELD.to_string(),
        }
    }

    #[test]
    fn default_rules_route_by_territory_then_budget_then_rotation() {
        let service = build_lead_service(
            &assignment_config(&["ana", "ben"]),
            Arc::new(InMemoryLeadRepository::default()),
        )
        .expect("service builds");

        let west = service
            .register(LeadRecord::new("w").with_attribute("state", "WA"))
            .expect("registers");
        let decision = service.route(&west.id).expect("routes");
        assert_eq!(decision.rule_id.as_deref(), Some("west_coast"));
        assert_eq!(decision.assign_to.as_deref(), Some("ana"));

        let big = service
            .register(LeadRecord::new("b").with_attribute("budget", 250_000.0))
            .expect("registers");
        let decision = service.route(&big.id).expect("routes");
        assert_eq!(decision.rule_id.as_deref(), Some("enterprise"));

        let other = service
            .register(LeadRecord::new("o").with_attribute("state", "TX"))
            .expect("registers");
        let decision = service.route(&other.id).expect("routes");
        assert!(decision.via_default);
        assert_eq!(decision.assign_to.as_deref(), Some("ben"));
    }

    #[test]
    fn territory_csv_is_loaded_from_config() {
        let path = std::env::temp_dir().join(format!("territories-{}.csv", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("temp file");
        writeln!(file, "territory,assignee\nwest,dana").expect("write csv");

        let mut config = assignment_config(&["ana"]);
        config.territory_csv = Some(path.clone());
        let assigner = build_assigner(&config).expect("assigner builds");
        std::fs::remove_file(&path).ok();

        assert_eq!(assigner.territories().len(), 1);
        let assignment = assigner
            .resolve(
                &AssignTarget::strategy("territory", DEFAULT_ROSTER),
                &LeadRecord::new("l").with_attribute("region", "West"),
            )
            .expect("assigns");
        assert_eq!(assignment.assignee, "dana");
    }

    #[test]
    fn missing_territory_file_is_an_error() {
        let mut config = assignment_config(&["ana"]);
        config.territory_csv = Some(std::path::PathBuf::from("/nonexistent/territories.csv"));
        assert!(matches!(build_assigner(&config), Err(AppError::Territory(_))));
    }
}
