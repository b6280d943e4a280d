//! Proposed actions and the declarative diffs produced when settling them.

use serde::{Deserialize, Serialize};

use crate::entities::{CharacterId, EventId};
use crate::error::{require_non_empty, Result};
use crate::Properties;

/// An already-validated change proposed for one character.
///
/// Produced upstream by the intent layer; the kernel trusts its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Action {
    pub character_id: CharacterId,
    pub action_type: String,
    #[serde(default)]
    pub parameters: Properties,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub source_event_id: Option<EventId>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Action {
    /// Create an action with no parameters, target or reasoning.
    pub fn new(character_id: impl Into<CharacterId>, action_type: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            action_type: action_type.into(),
            parameters: Properties::new(),
            target_id: None,
            source_event_id: None,
            reasoning: None,
        }
    }

    /// Insert one action parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Set the target the action is aimed at.
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    /// Link the event that prompted the action.
    pub fn with_source_event(mut self, event_id: impl Into<EventId>) -> Self {
        self.source_event_id = Some(event_id.into());
        self
    }

    /// Attach the proposer's reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Check that the actor and action type are set.
    pub fn validate(&self) -> Result<()> {
        require_non_empty(self.character_id.as_str(), "action", "character_id")?;
        require_non_empty(&self.action_type, "action", "action_type")
    }
}

/// One declarative diff against the world state.
///
/// `path` is a dotted address such as `resources.grain` or `characters.c-1.location_id`.
/// State changes are the only way rule effects leave the kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateChange {
    pub path: String,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub reason: String,
}

impl StateChange {
    /// Create a change from raw path and values.
    pub fn new(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
            reason: reason.into(),
        }
    }

    /// Change to `resources.<name>`.
    pub fn resource(name: &str, before: f64, after: f64, reason: impl Into<String>) -> Self {
        Self::new(
            format!("resources.{}", name),
            serde_json::json!(before),
            serde_json::json!(after),
            reason,
        )
    }

    /// Change to `flags.<name>`.
    pub fn flag(name: &str, before: bool, after: bool, reason: impl Into<String>) -> Self {
        Self::new(
            format!("flags.{}", name),
            serde_json::Value::Bool(before),
            serde_json::Value::Bool(after),
            reason,
        )
    }

    /// Change to `characters.<id>.<field>`.
    pub fn character_field(
        id: &CharacterId,
        field: &str,
        before: serde_json::Value,
        after: serde_json::Value,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(format!("characters.{}.{}", id, field), before, after, reason)
    }

    /// Split the dotted path into its segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }

    /// Check that path and reason are set.
    pub fn validate(&self) -> Result<()> {
        require_non_empty(&self.path, "state_change", "path")?;
        require_non_empty(&self.reason, "state_change", "reason")
    }
}

/// Outcome of an upstream action review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Rejected,
    /// The action was replaced by a safe default.
    Fallback,
}

/// Report of what happened to one proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionResult {
    pub action: Action,
    pub verdict: Verdict,
    #[serde(default)]
    pub state_changes: Vec<StateChange>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub fallback_reason: Option<String>,
    #[serde(default)]
    pub flavor_text: Option<String>,
}

impl ActionResult {
    /// Create a result with no changes. A `Fallback` verdict marks the result as a fallback.
    pub fn new(action: Action, verdict: Verdict) -> Self {
        Self {
            action,
            verdict,
            state_changes: Vec::new(),
            retry_count: 0,
            is_fallback: verdict == Verdict::Fallback,
            fallback_reason: None,
            flavor_text: None,
        }
    }

    /// Append the changes the settled action produced.
    pub fn with_state_changes(mut self, changes: impl IntoIterator<Item = StateChange>) -> Self {
        self.state_changes.extend(changes);
        self
    }

    /// Record how many re-proposals preceded this result.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Mark the result as a fallback and record why.
    pub fn with_fallback_reason(mut self, reason: impl Into<String>) -> Self {
        self.is_fallback = true;
        self.fallback_reason = Some(reason.into());
        self
    }

    /// Attach narration text for the result.
    pub fn with_flavor_text(mut self, text: impl Into<String>) -> Self {
        self.flavor_text = Some(text.into());
        self
    }
}
