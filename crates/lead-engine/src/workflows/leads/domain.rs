use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::qualification::QualificationResult;

/// Identifier assigned to a lead by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle position of a lead within the sales funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    #[default]
    New,
    Contacted,
    Nurturing,
    Qualified,
    Unqualified,
    Opportunity,
    Customer,
    Lost,
}

impl LifecycleStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Nurturing => "Nurturing",
            Self::Qualified => "Qualified",
            Self::Unqualified => "Unqualified",
            Self::Opportunity => "Opportunity",
            Self::Customer => "Customer",
            Self::Lost => "Lost",
        }
    }
}

/// Scalar attribute captured on a lead (state, industry, budget, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttributeValue {
    /// Numeric view of the value; text is parsed after trimming.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(value) if value.is_finite() => Some(*value),
            AttributeValue::Number(_) | AttributeValue::Bool(_) => None,
            AttributeValue::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(value) => write!(f, "{value}"),
            AttributeValue::Number(value) => write!(f, "{value}"),
            AttributeValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Prospective customer being scored and routed.
///
/// Attributes are opaque to the engines except through routing conditions;
/// `score`, `stage`, and `assigned_to` only change through engine outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: LeadId,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub stage: LifecycleStage,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub qualification_history: Vec<QualificationResult>,
}

impl LeadRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: LeadId(id.into()),
            attributes: BTreeMap::new(),
            score: None,
            stage: LifecycleStage::New,
            assigned_to: None,
            qualification_history: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, field: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(field.to_string(), value.into());
        self
    }

    pub fn attribute(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }

    /// Append a completed qualification run; earlier results are never rewritten.
    pub fn record_qualification(&mut self, result: QualificationResult) {
        self.score = Some(result.overall_score);
        self.stage = result.next_stage;
        self.qualification_history.push(result);
    }

    pub fn latest_qualification(&self) -> Option<&QualificationResult> {
        self.qualification_history.last()
    }

    pub fn summary_view(&self) -> LeadSummaryView {
        LeadSummaryView {
            lead_id: self.id.clone(),
            stage: self.stage.label(),
            score: self.score,
            assigned_to: self.assigned_to.clone(),
            assessments: self.qualification_history.len(),
        }
    }
}

/// Public status payload for a lead.
#[derive(Debug, Clone, Serialize)]
pub struct LeadSummaryView {
    pub lead_id: LeadId,
    pub stage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub assessments: usize,
}
