//! Priority-ordered routing rules and the assignment strategies they delegate to.

mod assignment;
mod condition;
mod engine;
mod rule;
mod rulebook;
mod territory;

pub use assignment::{
    Assigner, Assignment, AssignmentError, AssignmentSnapshot, AssignmentState,
    AssignmentStrategy, Roster,
};
pub use condition::{evaluate_condition, rule_matches};
pub use engine::{select_rule, RoutingDecision, RoutingEngine, RuleSelection};
pub use rule::{AssignTarget, ConditionOperator, ConditionValue, RoutingCondition, RoutingRule};
pub use rulebook::{RuleBook, RuleSnapshot};
pub use territory::{TerritoryImportError, TerritoryTable};

use super::qualification::ValidationError;

/// Error raised while routing a record.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RoutingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    /// The matched rule was removed or deactivated mid-decision; retry the whole decision.
    #[error("rule {rule_id} changed while routing; retry the decision")]
    ConcurrencyConflict { rule_id: String },
    #[error("unknown routing rule {0}")]
    UnknownRule(String),
}
