use serde::Serialize;
use tracing::debug;

use super::engine::{QualificationEngine, QualificationResult, StepEvaluation};
use super::workflow::{ResponseValue, Responses, ValidationError, Workflow};

/// Cursor position of an interactive qualification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InStep(usize),
    Completed,
}

/// Result of asking the session to move forward.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Advanced { step_index: usize },
    /// Gate not satisfied; the session stays on the current step.
    Blocked { step_index: usize, evaluation: StepEvaluation },
    Completed(QualificationResult),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot {action} while session is {state:?}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },
    #[error("criterion {0} does not belong to the current step")]
    UnknownCriterion(String),
}

/// Walks a workflow step by step, gating each transition.
#[derive(Debug, Clone)]
pub struct QualificationSession {
    workflow: Workflow,
    engine: QualificationEngine,
    state: SessionState,
    responses: Responses,
    result: Option<QualificationResult>,
    notes: Option<String>,
}

impl QualificationSession {
    pub fn new(workflow: Workflow) -> Result<Self, SessionError> {
        workflow.validate()?;
        Ok(Self {
            workflow,
            engine: QualificationEngine::new(),
            state: SessionState::NotStarted,
            responses: Responses::new(),
            result: None,
            notes: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn responses(&self) -> &Responses {
        &self.responses
    }

    pub fn result(&self) -> Option<&QualificationResult> {
        self.result.as_ref()
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = Some(notes.into());
    }

    pub fn start(&mut self) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::NotStarted => {
                self.state = SessionState::InStep(0);
                Ok(self.state)
            }
            state => Err(SessionError::InvalidTransition {
                state,
                action: "start",
            }),
        }
    }

    /// Record an answer for a criterion of the current step.
    pub fn respond(
        &mut self,
        criterion_id: &str,
        value: impl Into<ResponseValue>,
    ) -> Result<(), SessionError> {
        let index = self.current_step("respond")?;
        let belongs = self.workflow.steps[index]
            .criteria
            .iter()
            .any(|criterion| criterion.id == criterion_id);
        if !belongs {
            return Err(SessionError::UnknownCriterion(criterion_id.to_string()));
        }

        self.responses.insert(criterion_id.to_string(), value.into());
        Ok(())
    }

    pub fn evaluate_current(&self) -> Result<StepEvaluation, SessionError> {
        let index = self.current_step("evaluate")?;
        Ok(self
            .engine
            .assess(&self.workflow.steps[index], &self.responses))
    }

    pub fn advance(&mut self) -> Result<AdvanceOutcome, SessionError> {
        let index = self.current_step("advance")?;
        let evaluation = self
            .engine
            .assess(&self.workflow.steps[index], &self.responses);

        if !evaluation.can_advance {
            debug!(
                workflow = %self.workflow.id,
                step = %evaluation.step_id,
                unmet = evaluation.unmet_criteria.len(),
                "qualification step blocked"
            );
            return Ok(AdvanceOutcome::Blocked {
                step_index: index,
                evaluation,
            });
        }

        if index + 1 < self.workflow.steps.len() {
            self.state = SessionState::InStep(index + 1);
            return Ok(AdvanceOutcome::Advanced {
                step_index: index + 1,
            });
        }

        let result =
            self.engine
                .complete_workflow(&self.workflow, &self.responses, self.notes.clone())?;
        self.state = SessionState::Completed;
        self.result = Some(result.clone());
        Ok(AdvanceOutcome::Completed(result))
    }

    /// Move the cursor back one step. Responses are left untouched.
    pub fn back(&mut self) -> Result<SessionState, SessionError> {
        match self.state {
            SessionState::InStep(index) if index > 0 => {
                self.state = SessionState::InStep(index - 1);
                Ok(self.state)
            }
            state => Err(SessionError::InvalidTransition {
                state,
                action: "go back",
            }),
        }
    }

    fn current_step(&self, action: &'static str) -> Result<usize, SessionError> {
        match self.state {
            SessionState::InStep(index) => Ok(index),
            state => Err(SessionError::InvalidTransition { state, action }),
        }
    }
}
