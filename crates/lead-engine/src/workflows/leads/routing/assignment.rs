use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::super::domain::LeadRecord;
use super::rule::AssignTarget;
use super::territory::TerritoryTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    Direct,
    RoundRobin,
    LoadBalancing,
    Territory,
}

impl AssignmentStrategy {
    pub fn from_key(key: &str) -> Result<Self, AssignmentError> {
        match key.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "round_robin" | "round-robin" => Ok(Self::RoundRobin),
            "load_balancing" | "load-balancing" | "least_loaded" => Ok(Self::LoadBalancing),
            "territory" => Ok(Self::Territory),
            _ => Err(AssignmentError::UnknownStrategy(key.to_string())),
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::RoundRobin => "round_robin",
            Self::LoadBalancing => "load_balancing",
            Self::Territory => "territory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    #[error("no eligible assignee in roster {0}")]
    NoEligibleAssignee(String),
    #[error("unknown assignment strategy {0}")]
    UnknownStrategy(String),
    #[error("unknown roster {0}")]
    UnknownRoster(String),
    #[error("direct assignment needs an owner name")]
    MissingOwner,
}

/// Ordered list of people a strategy can pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub name: String,
    pub members: Vec<String>,
}

impl Roster {
    pub fn new(name: &str, members: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            members: members.iter().map(|member| member.to_string()).collect(),
        }
    }
}

/// Concrete owner chosen for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignee: String,
    pub strategy: AssignmentStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory: Option<String>,
}

/// Persistable copy of the assignment counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub round_robin_cursors: BTreeMap<String, u64>,
    pub loads: BTreeMap<String, u64>,
}

/// Round-robin cursors per roster and open-workload counters per assignee.
///
/// Each counter family sits behind its own mutex; a read-modify-write happens entirely
/// while the lock is held.
#[derive(Debug, Default)]
pub struct AssignmentState {
    cursors: Mutex<HashMap<String, u64>>,
    loads: Mutex<HashMap<String, u64>>,
}

impl AssignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restore(snapshot: AssignmentSnapshot) -> Self {
        Self {
            cursors: Mutex::new(snapshot.round_robin_cursors.into_iter().collect()),
            loads: Mutex::new(snapshot.loads.into_iter().collect()),
        }
    }

    pub fn snapshot(&self) -> AssignmentSnapshot {
        AssignmentSnapshot {
            round_robin_cursors: lock(&self.cursors)
                .iter()
                .map(|(roster, cursor)| (roster.clone(), *cursor))
                .collect(),
            loads: lock(&self.loads)
                .iter()
                .map(|(assignee, load)| (assignee.clone(), *load))
                .collect(),
        }
    }

    pub fn next_round_robin(&self, roster: &Roster) -> Result<String, AssignmentError> {
        if roster.members.is_empty() {
            return Err(AssignmentError::NoEligibleAssignee(roster.name.clone()));
        }

        let mut cursors = lock(&self.cursors);
        let cursor = cursors.entry(roster.name.clone()).or_insert(0);
        let index = (*cursor % roster.members.len() as u64) as usize;
        *cursor += 1;
        Ok(roster.members[index].clone())
    }

    /// Pick the member with the lowest open load (roster order breaks ties) and charge it.
    pub fn least_loaded(&self, roster: &Roster) -> Result<String, AssignmentError> {
        let mut loads = lock(&self.loads);
        let chosen = roster
            .members
            .iter()
            .enumerate()
            .min_by_key(|(position, member)| (loads.get(*member).copied().unwrap_or(0), *position))
            .map(|(_, member)| member.clone())
            .ok_or_else(|| AssignmentError::NoEligibleAssignee(roster.name.clone()))?;

        *loads.entry(chosen.clone()).or_insert(0) += 1;
        Ok(chosen)
    }

    /// Decrement an assignee's open load on completion or reassignment.
    pub fn release(&self, assignee: &str) -> u64 {
        let mut loads = lock(&self.loads);
        match loads.get_mut(assignee) {
            Some(load) => {
                *load = load.saturating_sub(1);
                *load
            }
            None => 0,
        }
    }

    pub fn load(&self, assignee: &str) -> u64 {
        lock(&self.loads).get(assignee).copied().unwrap_or(0)
    }

    pub fn cursor(&self, roster: &str) -> u64 {
        lock(&self.cursors).get(roster).copied().unwrap_or(0)
    }

    /// Administrative reset of one roster's cursor.
    pub fn reset_round_robin(&self, roster: &str) {
        lock(&self.cursors).remove(roster);
    }

    /// Administrative reset of every load counter.
    pub fn reset_loads(&self) {
        lock(&self.loads).clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resolves assignment targets to concrete owners using shared counters.
#[derive(Debug)]
pub struct Assigner {
    state: Arc<AssignmentState>,
    rosters: RwLock<HashMap<String, Roster>>,
    territories: TerritoryTable,
}

impl Assigner {
    pub fn new(state: Arc<AssignmentState>, territories: TerritoryTable) -> Self {
        Self {
            state,
            rosters: RwLock::new(HashMap::new()),
            territories,
        }
    }

    pub fn with_roster(self, roster: Roster) -> Self {
        self.register_roster(roster);
        self
    }

    pub fn register_roster(&self, roster: Roster) {
        self.rosters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(roster.name.clone(), roster);
    }

    pub fn roster(&self, name: &str) -> Result<Roster, AssignmentError> {
        self.rosters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| AssignmentError::UnknownRoster(name.to_string()))
    }

    pub fn state(&self) -> &Arc<AssignmentState> {
        &self.state
    }

    pub fn territories(&self) -> &TerritoryTable {
        &self.territories
    }

    /// Resolve a rule's target: owners pass through, strategies consult their roster.
    pub fn resolve(
        &self,
        target: &AssignTarget,
        record: &LeadRecord,
    ) -> Result<Assignment, AssignmentError> {
        match target {
            AssignTarget::Owner(owner) => Ok(Assignment {
                assignee: owner.clone(),
                strategy: AssignmentStrategy::Direct,
                territory: None,
            }),
            AssignTarget::Strategy { key, roster } => {
                let strategy = AssignmentStrategy::from_key(key)?;
                let roster = self.roster(roster)?;
                self.resolve_with(strategy, &roster, record)
            }
        }
    }

    /// Resolve a strategy key against an explicit roster.
    pub fn resolve_assignment(
        &self,
        strategy_key: &str,
        roster: &Roster,
        record: &LeadRecord,
    ) -> Result<Assignment, AssignmentError> {
        self.resolve_for_owner(strategy_key, None, roster, record)
    }

    /// Like [`Assigner::resolve_assignment`], but `direct` returns `owner` unchanged.
    /// Other strategies ignore the owner.
    pub fn resolve_for_owner(
        &self,
        strategy_key: &str,
        owner: Option<&str>,
        roster: &Roster,
        record: &LeadRecord,
    ) -> Result<Assignment, AssignmentError> {
        match (AssignmentStrategy::from_key(strategy_key)?, owner) {
            (AssignmentStrategy::Direct, Some(owner)) => {
                self.resolve(&AssignTarget::owner(owner), record)
            }
            (strategy, _) => self.resolve_with(strategy, roster, record),
        }
    }

    fn resolve_with(
        &self,
        strategy: AssignmentStrategy,
        roster: &Roster,
        record: &LeadRecord,
    ) -> Result<Assignment, AssignmentError> {
        let assignment = match strategy {
            AssignmentStrategy::Direct => return Err(AssignmentError::MissingOwner),
            AssignmentStrategy::RoundRobin => Assignment {
                assignee: self.state.next_round_robin(roster)?,
                strategy,
                territory: None,
            },
            AssignmentStrategy::LoadBalancing => Assignment {
                assignee: self.state.least_loaded(roster)?,
                strategy,
                territory: None,
            },
            AssignmentStrategy::Territory => match self.territories.lookup(record) {
                Some((territory, assignee)) => Assignment {
                    assignee: assignee.to_string(),
                    strategy,
                    territory: Some(territory.to_string()),
                },
                None => Assignment {
                    assignee: self.state.next_round_robin(roster)?,
                    strategy: AssignmentStrategy::RoundRobin,
                    territory: None,
                },
            },
        };

        debug!(
            record = %record.id,
            roster = %roster.name,
            strategy = assignment.strategy.key(),
            assignee = %assignment.assignee,
            "assignment resolved"
        );
        Ok(assignment)
    }
}
