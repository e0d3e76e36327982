use super::workflow::{Criterion, CriterionKind, ResponseValue};

/// Subscore for select answers with no entry in the quality table.
pub const UNMAPPED_SELECT_SCORE: f64 = 0.5;

/// Partial credit for any non-empty free-text answer. Content is not analyzed.
pub const TEXT_ANSWER_SCORE: f64 = 0.8;

/// Fixed quality table for select answers: priority, budget buckets, and timelines.
const SELECT_QUALITY: &[(&str, f64)] = &[
    ("Critical", 1.0),
    ("Important", 0.7),
    ("Nice to Have", 0.3),
    ("$100K+", 1.0),
    ("$50K - $100K", 0.8),
    ("$10K - $50K", 0.6),
    ("Under $10K", 0.3),
    ("Immediately", 1.0),
    ("Within 3 months", 0.8),
    ("3-6 months", 0.6),
    ("6-12 months", 0.4),
    ("No timeline", 0.1),
];

pub(crate) fn select_quality(answer: &str) -> f64 {
    let answer = answer.trim();
    SELECT_QUALITY
        .iter()
        .find(|(key, _)| *key == answer)
        .map(|(_, score)| *score)
        .unwrap_or(UNMAPPED_SELECT_SCORE)
}

/// Score one response in `[0, 1]`. Missing or mismatched responses score zero.
pub fn score_criterion(criterion: &Criterion, response: Option<&ResponseValue>) -> f64 {
    let Some(response) = response else {
        return 0.0;
    };

    match (&criterion.kind, response) {
        (CriterionKind::Boolean, ResponseValue::Boolean(true)) => 1.0,
        (CriterionKind::Boolean, _) => 0.0,
        (CriterionKind::Select { .. }, ResponseValue::Text(answer)) if !answer.trim().is_empty() => {
            select_quality(answer)
        }
        (CriterionKind::Select { .. }, _) => 0.0,
        (CriterionKind::Text, ResponseValue::Text(answer)) if !answer.trim().is_empty() => {
            TEXT_ANSWER_SCORE
        }
        (CriterionKind::Text, _) => 0.0,
    }
}

/// Whether the criterion counts as answered for step gating.
pub fn is_answered(response: Option<&ResponseValue>) -> bool {
    response.map(ResponseValue::is_answered).unwrap_or(false)
}
