use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use super::super::qualification::ValidationError;
use super::rule::{validate_rules, RoutingRule};
use super::RoutingError;

/// Immutable view of the rule set taken at the start of a routing decision.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    pub version: u64,
    pub rules: Arc<[RoutingRule]>,
}

#[derive(Debug)]
struct RuleBookState {
    version: u64,
    rules: Arc<[RoutingRule]>,
}

/// Shared rule definitions plus their match counters.
///
/// Readers take cheap snapshots; every definition edit or counter bump goes through the
/// write lock, so counter updates are serialized.
#[derive(Debug)]
pub struct RuleBook {
    state: RwLock<RuleBookState>,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self {
            state: RwLock::new(RuleBookState {
                version: 0,
                rules: Arc::from(Vec::new()),
            }),
        }
    }
}

impl RuleBook {
    pub fn new(rules: Vec<RoutingRule>) -> Result<Self, ValidationError> {
        let book = Self::default();
        book.replace(rules)?;
        Ok(book)
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        let state = self.read();
        RuleSnapshot {
            version: state.version,
            rules: Arc::clone(&state.rules),
        }
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Swap in a new rule set, keeping definition order.
    ///
    /// Rules whose id already exists keep their stored match count.
    pub fn replace(&self, mut rules: Vec<RoutingRule>) -> Result<u64, ValidationError> {
        validate_rules(&rules)?;
        warn_unmatchable(&rules);

        let mut state = self.write();
        for rule in &mut rules {
            if let Some(stored) = state.rules.iter().find(|stored| stored.id == rule.id) {
                rule.match_count = stored.match_count;
            }
        }
        state.rules = Arc::from(rules);
        state.version += 1;
        Ok(state.version)
    }

    /// Insert or replace a rule by id. New rules append to definition order; a replaced
    /// rule keeps its match count.
    pub fn upsert(&self, mut rule: RoutingRule) -> Result<u64, ValidationError> {
        let mut state = self.write();
        let mut rules = state.rules.to_vec();
        match rules.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => {
                rule.match_count = existing.match_count;
                *existing = rule;
            }
            None => rules.push(rule),
        }
        validate_rules(&rules)?;
        warn_unmatchable(&rules);

        state.rules = Arc::from(rules);
        state.version += 1;
        Ok(state.version)
    }

    pub fn set_active(&self, rule_id: &str, active: bool) -> Result<u64, RoutingError> {
        let mut state = self.write();
        let mut rules = state.rules.to_vec();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| RoutingError::UnknownRule(rule_id.to_string()))?;
        rule.is_active = active;

        state.rules = Arc::from(rules);
        state.version += 1;
        Ok(state.version)
    }

    /// Increment a rule's match count on behalf of a decision made against `snapshot_version`.
    ///
    /// Edits since the snapshot are tolerated unless they removed or deactivated the rule.
    pub fn record_match(&self, snapshot_version: u64, rule_id: &str) -> Result<u64, RoutingError> {
        let mut state = self.write();
        let stale = state.version != snapshot_version;
        let mut rules = state.rules.to_vec();

        let Some(rule) = rules.iter_mut().find(|rule| rule.id == rule_id) else {
            return Err(RoutingError::ConcurrencyConflict {
                rule_id: rule_id.to_string(),
            });
        };
        if stale && !rule.is_active {
            return Err(RoutingError::ConcurrencyConflict {
                rule_id: rule_id.to_string(),
            });
        }

        rule.match_count += 1;
        let count = rule.match_count;
        state.rules = Arc::from(rules);
        Ok(count)
    }

    pub fn match_count(&self, rule_id: &str) -> Option<u64> {
        self.read()
            .rules
            .iter()
            .find(|rule| rule.id == rule_id)
            .map(|rule| rule.match_count)
    }

    /// Administrative reset of every match counter.
    pub fn reset_match_counts(&self) {
        let mut state = self.write();
        let mut rules = state.rules.to_vec();
        for rule in &mut rules {
            rule.match_count = 0;
        }
        state.rules = Arc::from(rules);
        state.version += 1;
    }

    fn read(&self) -> RwLockReadGuard<'_, RuleBookState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RuleBookState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn warn_unmatchable(rules: &[RoutingRule]) {
    for rule in rules {
        if rule.conditions.is_empty() && !rule.is_default {
            warn!(rule = %rule.id, "routing rule has no conditions and will never match");
        }
    }
}
