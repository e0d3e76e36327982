use std::sync::Arc;

use tracing::info;

use super::domain::{LeadId, LeadRecord};
use super::qualification::{
    QualificationEngine, QualificationResult, Responses, StepEvaluation, ValidationError,
    WorkflowCatalog,
};
use super::repository::{LeadRepository, RepositoryError};
use super::routing::{Assignment, AssignmentError, Roster, RoutingDecision, RoutingEngine, RoutingError};

/// Service composing the qualification engine, routing engine, and repository.
pub struct LeadService<R> {
    repository: Arc<R>,
    catalog: Arc<WorkflowCatalog>,
    qualification: QualificationEngine,
    routing: RoutingEngine,
}

impl<R> LeadService<R>
where
    R: LeadRepository + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<WorkflowCatalog>, routing: RoutingEngine) -> Self {
        Self {
            repository,
            catalog,
            qualification: QualificationEngine::new(),
            routing,
        }
    }

    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    pub fn routing(&self) -> &RoutingEngine {
        &self.routing
    }

    /// Store a new lead exactly as the caller created it.
    pub fn register(&self, record: LeadRecord) -> Result<LeadRecord, LeadServiceError> {
        let stored = self.repository.insert(record)?;
        info!(lead = %stored.id, "lead registered");
        Ok(stored)
    }

    pub fn get(&self, lead_id: &LeadId) -> Result<LeadRecord, LeadServiceError> {
        let record = self
            .repository
            .fetch(lead_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn evaluate_step(
        &self,
        workflow_id: &str,
        step_index: usize,
        responses: &Responses,
    ) -> Result<StepEvaluation, LeadServiceError> {
        let workflow = self.catalog.get(workflow_id)?;
        Ok(self
            .qualification
            .evaluate_step(&workflow, step_index, responses)?)
    }

    /// Complete a workflow run for a lead and append the result to its history.
    pub fn qualify(
        &self,
        lead_id: &LeadId,
        workflow_id: &str,
        responses: &Responses,
        notes: Option<String>,
    ) -> Result<QualificationResult, LeadServiceError> {
        let workflow = self.catalog.get(workflow_id)?;
        let mut record = self.get(lead_id)?;

        let result = self
            .qualification
            .complete_workflow(&workflow, responses, notes)?;
        record.record_qualification(result.clone());
        self.repository.update(record)?;

        Ok(result)
    }

    /// Route a stored lead and persist the chosen owner.
    pub fn route(&self, lead_id: &LeadId) -> Result<RoutingDecision, LeadServiceError> {
        let mut record = self.get(lead_id)?;
        let decision = self.routing.route_record(&record)?;

        if let Some(assignee) = &decision.assign_to {
            record.assigned_to = Some(assignee.clone());
            self.repository.update(record)?;
        }

        Ok(decision)
    }

    pub fn resolve_assignment(
        &self,
        strategy_key: &str,
        roster: &Roster,
        record: &LeadRecord,
    ) -> Result<Assignment, LeadServiceError> {
        self.resolve_assignment_for(strategy_key, None, roster, record)
    }

    /// Resolve with an optional literal owner for the `direct` strategy.
    pub fn resolve_assignment_for(
        &self,
        strategy_key: &str,
        owner: Option<&str>,
        roster: &Roster,
        record: &LeadRecord,
    ) -> Result<Assignment, LeadServiceError> {
        Ok(self
            .routing
            .assigner()
            .resolve_for_owner(strategy_key, owner, roster, record)?)
    }

    pub fn roster(&self, name: &str) -> Result<Roster, LeadServiceError> {
        Ok(self.routing.assigner().roster(name)?)
    }

    /// Close out an assignment so load balancing sees the freed capacity.
    pub fn release_assignment(&self, assignee: &str) -> u64 {
        self.routing.assigner().state().release(assignee)
    }
}

/// Error raised by the lead service.
#[derive(Debug, thiserror::Error)]
pub enum LeadServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
