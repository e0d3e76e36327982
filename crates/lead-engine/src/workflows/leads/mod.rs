//! Lead qualification scoring and rule-based routing.
//!
//! `qualification` turns weighted, multi-step responses into a pass/fail decision and the
//! lead's next lifecycle stage. `routing` evaluates prioritized rules against a lead's
//! attributes and resolves the owner, either directly or through an assignment strategy that
//! shares round-robin and workload counters across calls. `LeadService` composes both over a
//! caller-supplied repository.

pub mod domain;
pub mod qualification;
pub mod repository;
pub mod router;
pub mod routing;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{AttributeValue, LeadId, LeadRecord, LeadSummaryView, LifecycleStage};
pub use qualification::{
    QualificationEngine, QualificationResult, QualificationSession, Responses, StepEvaluation,
    ValidationError, Workflow, WorkflowCatalog,
};
pub use repository::{LeadRepository, RepositoryError};
pub use router::lead_router;
pub use routing::{
    AssignTarget, Assigner, Assignment, AssignmentError, AssignmentState, Roster,
    RoutingDecision, RoutingEngine, RoutingError, RoutingRule, RuleBook, TerritoryTable,
};
pub use service::{LeadService, LeadServiceError};
