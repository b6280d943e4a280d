//! Character definitions.

use serde::{Deserialize, Serialize};

use super::{CharacterId, LocationId, StateMode};
use crate::error::{require_non_empty, ModelError, Result};
use crate::{Properties, Tick};

/// Importance assigned to characters that were not given one explicitly.
pub const DEFAULT_NARRATIVE_IMPORTANCE: f64 = 0.5;

/// A character living in the simulated world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub state_mode: StateMode,
    pub location_id: LocationId,

    /// How much the narrator cares about this character, from 0.0 to 1.0.
    #[serde(default = "default_importance")]
    pub narrative_importance: f64,

    #[serde(default)]
    pub last_active_tick: Tick,

    /// Insertion-ordered, duplicate free.
    #[serde(default)]
    pub status_effects: Vec<String>,

    /// Multi-tick action currently in progress, if any.
    #[serde(default)]
    pub long_action: Option<String>,

    #[serde(default)]
    pub state: Properties,
}

fn default_importance() -> f64 {
    DEFAULT_NARRATIVE_IMPORTANCE
}

impl Character {
    /// Create a new character with default importance and no effects.
    pub fn new(
        id: impl Into<CharacterId>,
        name: impl Into<String>,
        state_mode: StateMode,
        location_id: impl Into<LocationId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state_mode,
            location_id: location_id.into(),
            narrative_importance: DEFAULT_NARRATIVE_IMPORTANCE,
            last_active_tick: 0,
            status_effects: Vec::new(),
            long_action: None,
            state: Properties::new(),
        }
    }

    /// Set narrative importance. Out-of-range values are caught by [`Character::validate`].
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.narrative_importance = importance;
        self
    }

    /// Set the tick of the character's last action.
    pub fn with_last_active_tick(mut self, tick: Tick) -> Self {
        self.last_active_tick = tick;
        self
    }

    /// Add a status effect; re-adding an existing one keeps its position.
    pub fn with_status_effect(mut self, effect: impl Into<String>) -> Self {
        let effect = effect.into();
        if !self.status_effects.contains(&effect) {
            self.status_effects.push(effect);
        }
        self
    }

    /// Mark a multi-tick action as in progress.
    pub fn with_long_action(mut self, action: impl Into<String>) -> Self {
        self.long_action = Some(action.into());
        self
    }

    /// Insert one entry into the free-form state bag.
    pub fn with_state(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state.insert(key.into(), value);
        self
    }

    /// Check if the character carries a status effect.
    pub fn has_status(&self, effect: &str) -> bool {
        self.status_effects.iter().any(|e| e == effect)
    }

    /// Check if a long action is in progress.
    pub fn has_long_action(&self) -> bool {
        self.long_action.is_some()
    }

    /// Check field-level constraints.
    pub fn validate(&self) -> Result<()> {
        require_non_empty(self.id.as_str(), "character", "id")?;
        require_non_empty(&self.name, "character", "name")?;
        require_non_empty(self.location_id.as_str(), "character", "location_id")?;
        if !(0.0..=1.0).contains(&self.narrative_importance) {
            return Err(ModelError::OutOfRange {
                entity: "character",
                field: "narrative_importance",
                value: self.narrative_importance,
            });
        }
        for (index, effect) in self.status_effects.iter().enumerate() {
            if self.status_effects[..index].contains(effect) {
                return Err(ModelError::DuplicateEntry {
                    entity: "character",
                    field: "status_effects",
                    value: effect.clone(),
                });
            }
        }
        Ok(())
    }
}
