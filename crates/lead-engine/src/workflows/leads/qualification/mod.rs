//! Weighted, multi-step lead qualification.
//!
//! Criteria are scored individually, averaged per step, and combined into a weighted overall
//! score. Each step gates advancement on its required criteria and its passing score.

mod catalog;
mod criterion;
mod engine;
mod session;
mod workflow;

pub use catalog::{bant_workflow, WorkflowCatalog, BANT_WORKFLOW_ID};
pub use criterion::{is_answered, score_criterion, TEXT_ANSWER_SCORE, UNMAPPED_SELECT_SCORE};
pub use engine::{
    QualificationEngine, QualificationResult, StepEvaluation, StepScore, UnmetCriterion,
};
pub use session::{AdvanceOutcome, QualificationSession, SessionError, SessionState};
pub use workflow::{
    Criterion, CriterionKind, ResponseValue, Responses, Step, ValidationError, Workflow,
};
