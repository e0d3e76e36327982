use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::super::domain::LifecycleStage;
use super::criterion::{is_answered, score_criterion};
use super::workflow::{Responses, Step, ValidationError, Workflow};

/// Required criterion that blocks a step from advancing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetCriterion {
    pub criterion_id: String,
    pub question: String,
}

/// Score and gating status of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvaluation {
    pub step_id: String,
    pub step_score: f64,
    /// Minimum step score demanded by the gate.
    pub required_score: f64,
    pub can_advance: bool,
    pub unmet_criteria: Vec<UnmetCriterion>,
}

/// Contribution of one step to the overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepScore {
    pub step_id: String,
    pub score: f64,
    pub weight: f64,
}

/// Outcome of a completed workflow run. Re-assessment appends a new result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub workflow_id: String,
    pub overall_score: f64,
    pub passed: bool,
    pub responses: Responses,
    pub next_stage: LifecycleStage,
    pub step_scores: Vec<StepScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl QualificationResult {
    pub fn summary(&self) -> String {
        let verdict = if self.passed { "qualified" } else { "not qualified" };
        format!(
            "{verdict} on {} with score {:.1} -> {}",
            self.workflow_id,
            self.overall_score,
            self.next_stage.label()
        )
    }
}

/// Stateless scorer applying workflow definitions to responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct QualificationEngine;

impl QualificationEngine {
    pub fn new() -> Self {
        Self
    }

    /// `100 * sum(subscores) / criteria count`.
    pub fn step_score(&self, step: &Step, responses: &Responses) -> f64 {
        if step.criteria.is_empty() {
            return 0.0;
        }

        let total: f64 = step
            .criteria
            .iter()
            .map(|criterion| score_criterion(criterion, responses.get(&criterion.id)))
            .sum();

        100.0 * total / step.criteria.len() as f64
    }

    /// Gate threshold: `(passing_score / criteria count) * 100`.
    pub fn required_score(&self, step: &Step) -> f64 {
        if step.criteria.is_empty() {
            return 0.0;
        }
        (step.passing_score / step.criteria.len() as f64) * 100.0
    }

    pub fn unmet_criteria(&self, step: &Step, responses: &Responses) -> Vec<UnmetCriterion> {
        step.criteria
            .iter()
            .filter(|criterion| criterion.required && !is_answered(responses.get(&criterion.id)))
            .map(|criterion| UnmetCriterion {
                criterion_id: criterion.id.clone(),
                question: criterion.question.clone(),
            })
            .collect()
    }

    pub fn can_advance(&self, step: &Step, responses: &Responses) -> bool {
        self.assess(step, responses).can_advance
    }

    pub fn assess(&self, step: &Step, responses: &Responses) -> StepEvaluation {
        let step_score = self.step_score(step, responses);
        let required_score = self.required_score(step);
        let unmet_criteria = self.unmet_criteria(step, responses);
        let can_advance = unmet_criteria.is_empty() && step_score >= required_score;

        StepEvaluation {
            step_id: step.id.clone(),
            step_score,
            required_score,
            can_advance,
            unmet_criteria,
        }
    }

    pub fn evaluate_step(
        &self,
        workflow: &Workflow,
        step_index: usize,
        responses: &Responses,
    ) -> Result<StepEvaluation, ValidationError> {
        workflow.validate()?;
        let step = workflow
            .step(step_index)
            .ok_or_else(|| ValidationError::StepOutOfRange {
                workflow_id: workflow.id.clone(),
                index: step_index,
            })?;

        let evaluation = self.assess(step, responses);
        debug!(
            workflow = %workflow.id,
            step = %step.id,
            score = evaluation.step_score,
            can_advance = evaluation.can_advance,
            "evaluated qualification step"
        );
        Ok(evaluation)
    }

    /// Weighted mean of step scores, clamped to `[0, 100]`.
    pub fn overall_score(&self, workflow: &Workflow, responses: &Responses) -> f64 {
        let (weighted, weights) = workflow
            .steps
            .iter()
            .fold((0.0, 0.0), |(weighted, weights), step| {
                (
                    weighted + self.step_score(step, responses) * step.weight,
                    weights + step.weight,
                )
            });

        if weights <= 0.0 {
            return 0.0;
        }
        (weighted / weights).clamp(0.0, 100.0)
    }

    pub fn complete_workflow(
        &self,
        workflow: &Workflow,
        responses: &Responses,
        notes: Option<String>,
    ) -> Result<QualificationResult, ValidationError> {
        self.complete_workflow_at(workflow, responses, notes, Utc::now())
    }

    pub fn complete_workflow_at(
        &self,
        workflow: &Workflow,
        responses: &Responses,
        notes: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<QualificationResult, ValidationError> {
        workflow.validate()?;

        let step_scores = workflow
            .steps
            .iter()
            .map(|step| StepScore {
                step_id: step.id.clone(),
                score: self.step_score(step, responses),
                weight: step.weight,
            })
            .collect();
        let overall_score = self.overall_score(workflow, responses);
        let passed = overall_score >= workflow.qualification_threshold;
        let next_stage = if passed {
            workflow.next_stage_on_pass
        } else {
            workflow.next_stage_on_fail
        };

        info!(
            workflow = %workflow.id,
            score = overall_score,
            passed,
            next_stage = next_stage.label(),
            "qualification workflow completed"
        );

        Ok(QualificationResult {
            workflow_id: workflow.id.clone(),
            overall_score,
            passed,
            responses: responses.clone(),
            next_stage,
            step_scores,
            notes: notes.filter(|notes| !notes.trim().is_empty()),
            completed_at,
        })
    }
}
