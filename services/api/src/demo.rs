use crate::infra::{build_lead_service, InMemoryLeadRepository};
use clap::Args;
use lead_engine::config::{AssignmentConfig, DEFAULT_TERRITORY_FIELD};
use lead_engine::error::AppError;
use lead_engine::workflows::leads::qualification::{ResponseValue, BANT_WORKFLOW_ID};
use lead_engine::workflows::leads::routing::{
    AssignTarget, Assigner, AssignmentState, ConditionOperator, RoutingCondition, RoutingEngine,
    RoutingRule, RuleBook, TerritoryTable,
};
use lead_engine::workflows::leads::{
    LeadRecord, LeadRepository, LeadService, QualificationResult, Responses,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_ROSTER: &[&str] = &["alice", "bob", "carol"];

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Comma-separated members of the default roster (defaults to alice,bob,carol)
    #[arg(long, value_delimiter = ',')]
    pub(crate) roster: Vec<String>,
    /// Optional territory,assignee CSV used by the territory strategy
    #[arg(long)]
    pub(crate) territory_csv: Option<PathBuf>,
    /// Lead attribute the territory table keys on
    #[arg(long, default_value = DEFAULT_TERRITORY_FIELD)]
    pub(crate) territory_field: String,
    /// Stop after qualification without routing the sample leads
    #[arg(long)]
    pub(crate) skip_routing: bool,
}

/// Sample lead plus the answers gathered on its discovery call.
struct DemoLead {
    record: LeadRecord,
    responses: Responses,
    notes: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct RoutingSnapshot {
    rules: Vec<RuleCount>,
    counters: lead_engine::workflows::leads::routing::AssignmentSnapshot,
}

#[derive(Debug, Serialize)]
struct RuleCount {
    id: String,
    priority: i32,
    match_count: u64,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        roster,
        territory_csv,
        territory_field,
        skip_routing,
    } = args;

    let default_roster = if roster.is_empty() {
        DEMO_ROSTER.iter().map(|member| member.to_string()).collect()
    } else {
        roster
    };
    let config = AssignmentConfig {
        default_roster,
        territory_csv,
        territory_field,
    };

    let repository = Arc::new(InMemoryLeadRepository::default());
    let service = build_lead_service(&config, repository.clone())?;

    println!("Lead engine demo");
    println!(
        "- Default roster: {} | territory field '{}' ({} territories)",
        config.default_roster.join(", "),
        config.territory_field,
        service.routing().assigner().territories().len()
    );

    println!("\nQualification ({BANT_WORKFLOW_ID})");
    let leads = demo_leads();
    for lead in &leads {
        let record = match service.register(lead.record.clone()) {
            Ok(record) => record,
            Err(err) => {
                println!("  Registration rejected for {}: {}", lead.record.id, err);
                continue;
            }
        };

        match service.qualify(
            &record.id,
            BANT_WORKFLOW_ID,
            &lead.responses,
            lead.notes.map(str::to_string),
        ) {
            Ok(result) => render_qualification(&record, &result),
            Err(err) => println!("  {} could not be qualified: {}", record.id, err),
        }
    }

    if skip_routing {
        return Ok(());
    }

    println!("\nRouting");
    for lead in &leads {
        match service.route(&lead.record.id) {
            Ok(decision) if decision.matched => println!(
                "- {} -> {} via rule {}{}",
                lead.record.id,
                decision.assign_to.as_deref().unwrap_or("-"),
                decision.rule_id.as_deref().unwrap_or("-"),
                if decision.via_default { " (catch-all)" } else { "" }
            ),
            Ok(_) => println!("- {} matched no routing rule", lead.record.id),
            Err(err) => println!("- {} could not be routed: {}", lead.record.id, err),
        }
    }

    render_routing_state(&service);

    let counts = run_priority_example()?;
    println!("\nPriority example (state before industry)");
    for count in &counts {
        println!("- rule {} (priority {}): {} matches", count.id, count.priority, count.match_count);
    }

    if let Some(first) = leads.first() {
        match repository.fetch(&first.record.id) {
            Ok(Some(record)) => match serde_json::to_string_pretty(&record.summary_view()) {
                Ok(json) => println!("\nStored lead payload:\n{json}"),
                Err(err) => println!("\nStored lead payload unavailable: {err}"),
            },
            Ok(None) => println!("\nRepository lookup returned no record"),
            Err(err) => println!("\nRepository unavailable: {err}"),
        }
    }

    Ok(())
}

/// Rule A (`state equals CA`, priority 1) outranks rule B (`industry equals Technology`,
/// priority 2). A California tech lead lands on A; a Texas tech lead falls through to B.
fn run_priority_example() -> Result<Vec<RuleCount>, AppError> {
    let rules = RuleBook::new(vec![
        RoutingRule::new("A", "California", 1, AssignTarget::owner("alice")).with_condition(
            RoutingCondition::new("state", ConditionOperator::Equals, "CA"),
        ),
        RoutingRule::new("B", "Technology", 2, AssignTarget::owner("bob")).with_condition(
            RoutingCondition::new("industry", ConditionOperator::Equals, "Technology"),
        ),
    ])?;
    let engine = RoutingEngine::new(
        Arc::new(rules),
        Arc::new(Assigner::new(
            Arc::new(AssignmentState::new()),
            TerritoryTable::default(),
        )),
    );

    let leads = [
        LeadRecord::new("ca-tech")
            .with_attribute("state", "CA")
            .with_attribute("industry", "Technology"),
        LeadRecord::new("tx-tech")
            .with_attribute("state", "TX")
            .with_attribute("industry", "Technology"),
    ];
    for lead in &leads {
        match engine.route_record(lead) {
            Ok(decision) => println!(
                "- {} -> {} via rule {}",
                lead.id,
                decision.assign_to.as_deref().unwrap_or("-"),
                decision.rule_id.as_deref().unwrap_or("-")
            ),
            Err(err) => println!("- {} could not be routed: {}", lead.id, err),
        }
    }

    Ok(engine
        .rules()
        .snapshot()
        .rules
        .iter()
        .map(|rule| RuleCount {
            id: rule.id.clone(),
            priority: rule.priority,
            match_count: rule.match_count,
        })
        .collect())
}

fn render_qualification(record: &LeadRecord, result: &QualificationResult) {
    println!("- {}: {}", record.id, result.summary());
    for step in &result.step_scores {
        println!(
            "    - {}: {:.1} (weight {:.2})",
            step.step_id, step.score, step.weight
        );
    }
    if let Some(notes) = &result.notes {
        println!("    notes: {notes}");
    }
}

fn render_routing_state<R>(service: &LeadService<R>)
where
    R: LeadRepository + 'static,
{
    let snapshot = service.routing().rules().snapshot();
    let state = RoutingSnapshot {
        rules: snapshot
            .rules
            .iter()
            .map(|rule| RuleCount {
                id: rule.id.clone(),
                priority: rule.priority,
                match_count: rule.match_count,
            })
            .collect(),
        counters: service.routing().assigner().state().snapshot(),
    };

    match serde_json::to_string_pretty(&state) {
        Ok(json) => println!("\nRouting counters:\n{json}"),
        Err(err) => println!("\nRouting counters unavailable: {err}"),
    }
}

fn responses(entries: &[(&str, ResponseValue)]) -> Responses {
    entries
        .iter()
        .map(|(id, value)| (id.to_string(), value.clone()))
        .collect()
}

fn demo_leads() -> Vec<DemoLead> {
    vec![
        DemoLead {
            record: LeadRecord::new("northwind")
                .with_attribute("company", "Northwind Traders")
                .with_attribute("state", "CA")
                .with_attribute("region", "west")
                .with_attribute("budget", 180_000.0),
            responses: responses(&[
                ("has_budget", true.into()),
                ("budget_range", "$100K+".into()),
                ("budget_notes", "Board approved for this fiscal year".into()),
                ("is_decision_maker", true.into()),
                ("decision_process", "COO signs; procurement review in parallel".into()),
                ("priority", "Critical".into()),
                ("pain_points", "Reps spend hours triaging inbound leads".into()),
                ("timeline", "Immediately".into()),
                ("compelling_event", true.into()),
            ]),
            notes: Some("Champion is the VP of Sales Ops"),
        },
        DemoLead {
            record: LeadRecord::new("contoso")
                .with_attribute("company", "Contoso Ltd")
                .with_attribute("state", "TX")
                .with_attribute("budget", 250_000.0),
            responses: responses(&[
                ("has_budget", true.into()),
                ("budget_range", "$50K - $100K".into()),
                ("is_decision_maker", false.into()),
                ("priority", "Important".into()),
                ("pain_points", "CRM data is stale".into()),
                ("timeline", "3-6 months".into()),
            ]),
            notes: None,
        },
        DemoLead {
            record: LeadRecord::new("fabrikam")
                .with_attribute("company", "Fabrikam")
                .with_attribute("state", "NY")
                .with_attribute("budget", 8_000.0),
            responses: responses(&[
                ("has_budget", false.into()),
                ("budget_range", "Under $10K".into()),
                ("is_decision_maker", false.into()),
                ("priority", "Nice to Have".into()),
                ("pain_points", "Exploring options".into()),
                ("timeline", "No timeline".into()),
            ]),
            notes: Some("Revisit next quarter"),
        },
    ]
}
