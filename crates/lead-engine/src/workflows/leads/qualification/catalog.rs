use std::collections::HashMap;
use std::sync::Arc;

use super::super::domain::LifecycleStage;
use super::workflow::{Criterion, Step, ValidationError, Workflow};

pub const BANT_WORKFLOW_ID: &str = "bant";

/// Registry of validated workflow definitions.
#[derive(Debug, Default, Clone)]
pub struct WorkflowCatalog {
    workflows: HashMap<String, Arc<Workflow>>,
}

impl WorkflowCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with the Budget/Authority/Need/Timeline workflow.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        catalog
            .workflows
            .insert(BANT_WORKFLOW_ID.to_string(), Arc::new(bant_workflow()));
        catalog
    }

    pub fn register(&mut self, workflow: Workflow) -> Result<Arc<Workflow>, ValidationError> {
        workflow.validate()?;
        let workflow = Arc::new(workflow);
        self.workflows
            .insert(workflow.id.clone(), Arc::clone(&workflow));
        Ok(workflow)
    }

    pub fn get(&self, workflow_id: &str) -> Result<Arc<Workflow>, ValidationError> {
        self.workflows
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownWorkflow(workflow_id.to_string()))
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

pub fn bant_workflow() -> Workflow {
    Workflow {
        id: BANT_WORKFLOW_ID.to_string(),
        name: "BANT".to_string(),
        steps: vec![
            Step {
                id: "budget".to_string(),
                name: "Budget".to_string(),
                criteria: vec![
                    Criterion::boolean("has_budget", "Is budget allocated for this purchase?", true),
                    Criterion::select(
                        "budget_range",
                        "What is the approved budget range?",
                        &["$100K+", "$50K - $100K", "$10K - $50K", "Under $10K"],
                        true,
                    ),
                    Criterion::text("budget_notes", "Any constraints on spend?", false),
                ],
                weight: 0.3,
                passing_score: 2.0,
            },
            Step {
                id: "authority".to_string(),
                name: "Authority".to_string(),
                criteria: vec![
                    Criterion::boolean(
                        "is_decision_maker",
                        "Is the contact the final decision maker?",
                        true,
                    ),
                    Criterion::text(
                        "decision_process",
                        "Who else signs off on the purchase?",
                        false,
                    ),
                ],
                weight: 0.25,
                passing_score: 1.0,
            },
            Step {
                id: "need".to_string(),
                name: "Need".to_string(),
                criteria: vec![
                    Criterion::select(
                        "priority",
                        "How important is solving this problem?",
                        &["Critical", "Important", "Nice to Have"],
                        true,
                    ),
                    Criterion::text("pain_points", "Describe the current pain points", true),
                ],
                weight: 0.25,
                passing_score: 1.0,
            },
            Step {
                id: "timeline".to_string(),
                name: "Timeline".to_string(),
                criteria: vec![
                    Criterion::select(
                        "timeline",
                        "When do you plan to purchase?",
                        &[
                            "Immediately",
                            "Within 3 months",
                            "3-6 months",
                            "6-12 months",
                            "No timeline",
                        ],
                        true,
                    ),
                    Criterion::boolean(
                        "compelling_event",
                        "Is there a deadline driving the purchase?",
                        false,
                    ),
                ],
                weight: 0.2,
                passing_score: 1.0,
            },
        ],
        qualification_threshold: 70.0,
        next_stage_on_pass: LifecycleStage::Qualified,
        next_stage_on_fail: LifecycleStage::Nurturing,
    }
}
