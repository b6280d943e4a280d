//! Settlement results and the per-rule audit trail.

use serde::{Deserialize, Serialize};
use world_model::StateChange;

/// Outcome of one rule during a settlement pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecutionRecord {
    pub rule_name: String,
    pub priority: i32,
    pub matched: bool,
    pub state_change_count: usize,
}

/// Everything one settlement pass produced.
///
/// Both sequences are in rule execution order; changes from one rule keep the
/// order the rule returned them in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleEngineResult {
    state_changes: Vec<StateChange>,
    audit_log: Vec<RuleExecutionRecord>,
}

impl RuleEngineResult {
    pub(crate) fn new(state_changes: Vec<StateChange>, audit_log: Vec<RuleExecutionRecord>) -> Self {
        Self {
            state_changes,
            audit_log,
        }
    }

    /// Changes of all matched rules, in execution order.
    pub fn state_changes(&self) -> &[StateChange] {
        &self.state_changes
    }

    /// One record per rule, in execution order.
    pub fn audit_log(&self) -> &[RuleExecutionRecord] {
        &self.audit_log
    }

    /// Records of rules whose `matches` returned true.
    pub fn matched_rules(&self) -> impl Iterator<Item = &RuleExecutionRecord> {
        self.audit_log.iter().filter(|record| record.matched)
    }

    /// True when the pass produced no state changes.
    pub fn is_empty(&self) -> bool {
        self.state_changes.is_empty()
    }

    /// Split into changes and audit log.
    pub fn into_parts(self) -> (Vec<StateChange>, Vec<RuleExecutionRecord>) {
        (self.state_changes, self.audit_log)
    }
}
