use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::super::domain::LifecycleStage;

/// Response shape a criterion expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriterionKind {
    Boolean,
    Select { options: Vec<String> },
    Text,
}

impl CriterionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            CriterionKind::Boolean => "boolean",
            CriterionKind::Select { .. } => "select",
            CriterionKind::Text => "text",
        }
    }
}

/// Single qualification question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    pub question: String,
    #[serde(flatten)]
    pub kind: CriterionKind,
    #[serde(default)]
    pub required: bool,
}

impl Criterion {
    pub fn boolean(id: &str, question: &str, required: bool) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            kind: CriterionKind::Boolean,
            required,
        }
    }

    pub fn select(id: &str, question: &str, options: &[&str], required: bool) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            kind: CriterionKind::Select {
                options: options.iter().map(|option| option.to_string()).collect(),
            },
            required,
        }
    }

    pub fn text(id: &str, question: &str, required: bool) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            kind: CriterionKind::Text,
            required,
        }
    }
}

/// Answer captured for a criterion. Select answers arrive as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Boolean(bool),
    Text(String),
}

impl ResponseValue {
    pub fn is_answered(&self) -> bool {
        match self {
            ResponseValue::Boolean(_) => true,
            ResponseValue::Text(value) => !value.trim().is_empty(),
        }
    }
}

impl From<bool> for ResponseValue {
    fn from(value: bool) -> Self {
        ResponseValue::Boolean(value)
    }
}

impl From<&str> for ResponseValue {
    fn from(value: &str) -> Self {
        ResponseValue::Text(value.to_string())
    }
}

/// Responses keyed by criterion id. A missing key is an unanswered criterion.
pub type Responses = BTreeMap<String, ResponseValue>;

/// Named, weighted group of criteria with its own pass threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub criteria: Vec<Criterion>,
    pub weight: f64,
    pub passing_score: f64,
}

/// Ordered qualification process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub steps: Vec<Step>,
    pub qualification_threshold: f64,
    pub next_stage_on_pass: LifecycleStage,
    pub next_stage_on_fail: LifecycleStage,
}

impl Workflow {
    /// Reject definitions the scoring formulas cannot handle.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::MissingWorkflowId);
        }
        if self.steps.is_empty() {
            return Err(ValidationError::EmptyWorkflow {
                workflow_id: self.id.clone(),
            });
        }
        if !self.qualification_threshold.is_finite() {
            return Err(ValidationError::InvalidThreshold {
                workflow_id: self.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !step.weight.is_finite() || step.weight <= 0.0 {
                return Err(ValidationError::NonPositiveWeight {
                    step_id: step.id.clone(),
                    weight: step.weight,
                });
            }
            if !step.passing_score.is_finite() {
                return Err(ValidationError::InvalidPassingScore {
                    step_id: step.id.clone(),
                });
            }
            if step.criteria.is_empty() {
                return Err(ValidationError::EmptyStep {
                    step_id: step.id.clone(),
                });
            }

            for criterion in &step.criteria {
                if !seen.insert(criterion.id.as_str()) {
                    return Err(ValidationError::DuplicateCriterion {
                        criterion_id: criterion.id.clone(),
                    });
                }
                if let CriterionKind::Select { options } = &criterion.kind {
                    if options.is_empty() {
                        return Err(ValidationError::SelectWithoutOptions {
                            criterion_id: criterion.id.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }
}

/// Malformed workflow or rule configuration. Not retryable without a config fix.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("workflow id must not be blank")]
    MissingWorkflowId,
    #[error("workflow {workflow_id} has no steps")]
    EmptyWorkflow { workflow_id: String },
    #[error("workflow {workflow_id} qualification threshold must be finite")]
    InvalidThreshold { workflow_id: String },
    #[error("step {step_id} weight must be positive (found {weight})")]
    NonPositiveWeight { step_id: String, weight: f64 },
    #[error("step {step_id} passing score must be finite")]
    InvalidPassingScore { step_id: String },
    #[error("step {step_id} has no criteria")]
    EmptyStep { step_id: String },
    #[error("criterion {criterion_id} is defined more than once")]
    DuplicateCriterion { criterion_id: String },
    #[error("select criterion {criterion_id} has no options")]
    SelectWithoutOptions { criterion_id: String },
    #[error("step index {index} is out of range for workflow {workflow_id}")]
    StepOutOfRange { workflow_id: String, index: usize },
    #[error("unknown workflow {0}")]
    UnknownWorkflow(String),
    #[error("routing rule id must not be blank")]
    MissingRuleId,
    #[error("routing rule {0} is defined more than once")]
    DuplicateRule(String),
}
