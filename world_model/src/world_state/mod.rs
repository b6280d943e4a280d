//! World state - the frozen snapshot every rule is evaluated against.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{Character, CharacterId, Event, EventId, StateMode};
use crate::error::{ModelError, Result};
use crate::{Seed, Tick};

/// Time resolution the world is currently simulated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    Year,
    Month,
    #[default]
    Day,
    /// Moment-to-moment play, used for scenes and encounters.
    Instant,
}

/// Unvalidated world state fields.
///
/// Used to build a [`WorldState`] from arbitrary maps, and to take one apart
/// again when the orchestrator applies state changes between passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldStateParts {
    pub tick: Tick,
    pub seed: Seed,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default)]
    pub characters: BTreeMap<CharacterId, Character>,
    #[serde(default)]
    pub events: BTreeMap<EventId, Event>,
    #[serde(default)]
    pub resources: BTreeMap<String, f64>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
}

impl WorldStateParts {
    /// Empty parts at the given tick.
    pub fn new(tick: Tick, seed: Seed) -> Self {
        Self {
            tick,
            seed,
            granularity: Granularity::default(),
            characters: BTreeMap::new(),
            events: BTreeMap::new(),
            resources: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }
}

/// The complete state of the world at one tick.
///
/// Every character and event is stored under its own id. Maps are ordered so
/// that iteration, and therefore anything a rule derives from it, is stable
/// across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorldStateParts", into = "WorldStateParts")]
pub struct WorldState {
    tick: Tick,
    seed: Seed,
    granularity: Granularity,
    characters: BTreeMap<CharacterId, Character>,
    events: BTreeMap<EventId, Event>,
    resources: BTreeMap<String, f64>,
    flags: BTreeMap<String, bool>,
}

impl WorldState {
    /// Create an empty world at the given tick.
    pub fn new(tick: Tick, seed: Seed) -> Self {
        Self {
            tick,
            seed,
            granularity: Granularity::default(),
            characters: BTreeMap::new(),
            events: BTreeMap::new(),
            resources: BTreeMap::new(),
            flags: BTreeMap::new(),
        }
    }

    /// Set the simulation resolution.
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Add a character keyed by its own id.
    pub fn with_character(mut self, character: Character) -> Result<Self> {
        character.validate()?;
        self.characters.insert(character.id.clone(), character);
        Ok(self)
    }

    /// Add an event keyed by its own id.
    pub fn with_event(mut self, event: Event) -> Result<Self> {
        event.validate()?;
        self.events.insert(event.id.clone(), event);
        Ok(self)
    }

    /// Set a named resource amount.
    pub fn with_resource(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.resources.insert(name.into(), amount);
        self
    }

    /// Set a named boolean flag.
    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Tick this snapshot was taken at.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Global seed of the run.
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Current simulation resolution.
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// All characters, keyed and ordered by id.
    pub fn characters(&self) -> &BTreeMap<CharacterId, Character> {
        &self.characters
    }

    /// All events, keyed and ordered by id.
    pub fn events(&self) -> &BTreeMap<EventId, Event> {
        &self.events
    }

    /// Resource amounts by name.
    pub fn resources(&self) -> &BTreeMap<String, f64> {
        &self.resources
    }

    /// Explicitly set flags by name.
    pub fn flags(&self) -> &BTreeMap<String, bool> {
        &self.flags
    }

    /// Look up a character by id.
    pub fn character(&self, id: &CharacterId) -> Option<&Character> {
        self.characters.get(id)
    }

    /// Look up an event by id.
    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.events.get(id)
    }

    /// Amount of a resource, `None` if it was never set.
    pub fn resource(&self, name: &str) -> Option<f64> {
        self.resources.get(name).copied()
    }

    /// Unset flags read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Characters in the given mode, in id order.
    pub fn characters_in_mode(&self, mode: StateMode) -> impl Iterator<Item = &Character> {
        self.characters
            .values()
            .filter(move |c| c.state_mode == mode)
    }

    /// Events that are still open, in id order.
    pub fn unresolved_events(&self) -> impl Iterator<Item = &Event> {
        self.events.values().filter(|e| !e.resolved)
    }

    /// Take the snapshot apart so it can be edited and re-validated.
    pub fn into_parts(self) -> WorldStateParts {
        WorldStateParts {
            tick: self.tick,
            seed: self.seed,
            granularity: self.granularity,
            characters: self.characters,
            events: self.events,
            resources: self.resources,
            flags: self.flags,
        }
    }
}

impl TryFrom<WorldStateParts> for WorldState {
    type Error = ModelError;

    fn try_from(parts: WorldStateParts) -> Result<Self> {
        for (key, character) in &parts.characters {
            if *key != character.id {
                return Err(ModelError::CharacterKeyMismatch {
                    key: key.to_string(),
                    id: character.id.to_string(),
                });
            }
            character.validate()?;
        }

        for (key, event) in &parts.events {
            if *key != event.id {
                return Err(ModelError::EventKeyMismatch {
                    key: key.to_string(),
                    id: event.id.to_string(),
                });
            }
            event.validate()?;
        }

        Ok(Self {
            tick: parts.tick,
            seed: parts.seed,
            granularity: parts.granularity,
            characters: parts.characters,
            events: parts.events,
            resources: parts.resources,
            flags: parts.flags,
        })
    }
}

impl From<WorldState> for WorldStateParts {
    fn from(state: WorldState) -> Self {
        state.into_parts()
    }
}
