//! World event definitions.

use serde::{Deserialize, Serialize};

use super::EventId;
use crate::error::{require_non_empty, Result};
use crate::{Properties, Tick};

/// Something that happened in the world and may still shape later ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    pub id: EventId,
    pub tick_created: Tick,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Who or what the event touches (e.g. `"location": "loc-1"`).
    #[serde(default)]
    pub impact_scope: Properties,

    /// Effects that rules must enforce.
    #[serde(default)]
    pub hard_effects: Vec<String>,

    /// Hints for narration; never enforced.
    #[serde(default)]
    pub soft_prompts: Vec<String>,

    #[serde(default)]
    pub resolved: bool,
}

impl Event {
    /// Create an unresolved event with no tags or effects.
    pub fn new(id: impl Into<EventId>, tick_created: Tick) -> Self {
        Self {
            id: id.into(),
            tick_created,
            tags: Vec::new(),
            impact_scope: Properties::new(),
            hard_effects: Vec::new(),
            soft_prompts: Vec::new(),
            resolved: false,
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Insert one entry into the impact scope.
    pub fn with_scope(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.impact_scope.insert(key.into(), value);
        self
    }

    /// Add an effect the rules must enforce.
    pub fn with_hard_effect(mut self, effect: impl Into<String>) -> Self {
        self.hard_effects.push(effect.into());
        self
    }

    /// Add a narrative hint with no mechanical weight.
    pub fn with_soft_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.soft_prompts.push(prompt.into());
        self
    }

    /// Mark the event as resolved.
    pub fn resolved(mut self) -> Self {
        self.resolved = true;
        self
    }

    /// Check if the event carries a tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Check that the id is set.
    pub fn validate(&self) -> Result<()> {
        require_non_empty(self.id.as_str(), "event", "id")
    }
}
