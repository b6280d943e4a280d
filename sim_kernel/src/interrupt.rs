//! Interrupt detection for long-running character actions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use world_model::{CharacterId, ModelError, Properties, Tick, WorldState};

use crate::error::{KernelError, Result, RuleError};

/// Notice that a character's in-progress action should be reconsidered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptSignal {
    pub character_id: CharacterId,
    pub reason: String,
    pub tick: Tick,
    #[serde(default)]
    pub metadata: Properties,
}

impl InterruptSignal {
    /// Create a signal with empty metadata.
    pub fn new(character_id: impl Into<CharacterId>, reason: impl Into<String>, tick: Tick) -> Self {
        Self {
            character_id: character_id.into(),
            reason: reason.into(),
            tick,
            metadata: Properties::new(),
        }
    }

    /// Insert one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check that the target character and reason are set.
    pub fn validate(&self) -> world_model::Result<()> {
        if self.character_id.is_empty() {
            return Err(ModelError::EmptyField {
                entity: "interrupt_signal",
                field: "character_id",
            });
        }
        if self.reason.is_empty() {
            return Err(ModelError::EmptyField {
                entity: "interrupt_signal",
                field: "reason",
            });
        }
        Ok(())
    }
}

/// Source of interrupt signals.
///
/// Implemented for plain closures of the same shape as [`InterruptRule::check`].
pub trait InterruptRule: Send + Sync {
    /// Used when reporting failures.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Signals raised for `tick`, possibly none.
    fn check(&self, world: &WorldState, tick: Tick)
        -> std::result::Result<Vec<InterruptSignal>, RuleError>;
}

impl<F> InterruptRule for F
where
    F: Fn(&WorldState, Tick) -> std::result::Result<Vec<InterruptSignal>, RuleError> + Send + Sync,
{
    fn check(
        &self,
        world: &WorldState,
        tick: Tick,
    ) -> std::result::Result<Vec<InterruptSignal>, RuleError> {
        self(world, tick)
    }
}

#[derive(Default)]
pub struct InterruptManagerBuilder {
    rules: Vec<Box<dyn InterruptRule>>,
}

impl InterruptManagerBuilder {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule; rules are checked in registration order.
    pub fn register(self, rule: impl InterruptRule + 'static) -> Self {
        self.register_boxed(Box::new(rule))
    }

    /// Same as [`InterruptManagerBuilder::register`] for an already boxed rule.
    pub fn register_boxed(mut self, rule: Box<dyn InterruptRule>) -> Self {
        tracing::debug!(rule = rule.name(), index = self.rules.len(), "interrupt rule registered");
        self.rules.push(rule);
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> InterruptManager {
        InterruptManager {
            rules: self.rules.into(),
        }
    }
}

/// Collects interrupt signals from every registered rule, in registration order.
#[derive(Clone)]
pub struct InterruptManager {
    rules: Arc<[Box<dyn InterruptRule>]>,
}

impl InterruptManager {
    /// Start registering rules.
    pub fn builder() -> InterruptManagerBuilder {
        InterruptManagerBuilder::new()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Concatenate the signals of all rules for `tick`.
    ///
    /// Signals are not deduplicated. The first failing rule aborts the call; a
    /// rule emitting a signal without character or reason counts as failing.
    pub fn check(&self, world: &WorldState, tick: Tick) -> Result<Vec<InterruptSignal>> {
        let mut signals = Vec::new();

        for (index, rule) in self.rules.iter().enumerate() {
            let failure = |source: RuleError| {
                tracing::warn!(
                    rule = rule.name(),
                    index,
                    tick,
                    error = %source,
                    "interrupt rule failed"
                );
                KernelError::InterruptRuleFailure {
                    rule_name: rule.name().to_string(),
                    index,
                    source,
                }
            };

            let emitted = rule.check(world, tick).map_err(failure)?;
            for signal in &emitted {
                signal.validate().map_err(|err| failure(Box::new(err)))?;
            }
            signals.extend(emitted);
        }

        tracing::debug!(
            tick,
            rules = self.rules.len(),
            signals = signals.len(),
            "interrupt check complete"
        );
        Ok(signals)
    }
}

impl std::fmt::Debug for InterruptManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptManager")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::{Character, Granularity, StateMode};

    struct StaticInterruptRule {
        signals: Vec<InterruptSignal>,
    }

    impl InterruptRule for StaticInterruptRule {
        fn check(
            &self,
            _: &WorldState,
            _: Tick,
        ) -> std::result::Result<Vec<InterruptSignal>, RuleError> {
            Ok(self.signals.clone())
        }
    }

    struct FailingInterruptRule;

    impl InterruptRule for FailingInterruptRule {
        fn name(&self) -> &str {
            "failing"
        }

        fn check(
            &self,
            _: &WorldState,
            _: Tick,
        ) -> std::result::Result<Vec<InterruptSignal>, RuleError> {
            Err("interrupt check failed".into())
        }
    }

    fn build_world() -> WorldState {
        WorldState::new(0, 99)
            .with_granularity(Granularity::Day)
            .with_character(Character::new("c-1", "Alice", StateMode::Active, "loc-1"))
            .unwrap()
    }

    #[test]
    fn test_aggregates_by_registration_order() {
        let storm = InterruptSignal::new("c-1", "storm", 2);
        let attack = InterruptSignal::new("c-1", "attack", 2);
        let manager = InterruptManager::builder()
            .register(StaticInterruptRule {
                signals: vec![storm.clone()],
            })
            .register(StaticInterruptRule {
                signals: vec![attack.clone()],
            })
            .build();

        assert_eq!(manager.check(&build_world(), 2).unwrap(), vec![storm, attack]);
    }

    #[test]
    fn test_does_not_deduplicate() {
        let storm = InterruptSignal::new("c-1", "storm", 1);
        let rule = || StaticInterruptRule {
            signals: vec![storm.clone()],
        };
        let manager = InterruptManager::builder().register(rule()).register(rule()).build();

        assert_eq!(manager.check(&build_world(), 1).unwrap().len(), 2);
    }

    #[test]
    fn test_returns_empty_without_rules() {
        let manager = InterruptManager::builder().build();
        assert!(manager.is_empty());
        assert!(manager.check(&build_world(), 1).unwrap().is_empty());
    }

    #[test]
    fn test_bubbles_rule_error() {
        let manager = InterruptManager::builder()
            .register(StaticInterruptRule {
                signals: vec![InterruptSignal::new("c-1", "storm", 3)],
            })
            .register(FailingInterruptRule)
            .build();

        let err = manager.check(&build_world(), 3).unwrap_err();
        match err {
            KernelError::InterruptRuleFailure {
                rule_name,
                index,
                source,
            } => {
                assert_eq!(rule_name, "failing");
                assert_eq!(index, 1);
                assert_eq!(source.to_string(), "interrupt check failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_signal_validate() {
        assert!(InterruptSignal::new("c-1", "storm", 1).validate().is_ok());
        assert_eq!(
            InterruptSignal::new("", "storm", 1).validate(),
            Err(ModelError::EmptyField {
                entity: "interrupt_signal",
                field: "character_id"
            })
        );
        assert_eq!(
            InterruptSignal::new("c-1", "", 1).validate(),
            Err(ModelError::EmptyField {
                entity: "interrupt_signal",
                field: "reason"
            })
        );
    }

    #[test]
    fn test_malformed_signal_fails_rule() {
        let manager = InterruptManager::builder()
            .register(StaticInterruptRule {
                signals: vec![InterruptSignal::new("c-1", "storm", 2)],
            })
            .register(StaticInterruptRule {
                signals: vec![InterruptSignal::new("c-1", "", 2)],
            })
            .build();

        match manager.check(&build_world(), 2).unwrap_err() {
            KernelError::InterruptRuleFailure { index, source, .. } => {
                assert_eq!(index, 1);
                assert!(source.is::<ModelError>());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_closure_rule_sees_world() {
        let long_actions = |world: &WorldState,
                            tick: Tick|
         -> std::result::Result<Vec<InterruptSignal>, RuleError> {
            Ok(world
                .characters()
                .values()
                .filter(|c| c.has_long_action())
                .map(|c| InterruptSignal::new(c.id.clone(), "woken", tick))
                .collect())
        };
        let manager = InterruptManager::builder().register(long_actions).build();

        let world = WorldState::new(0, 1)
            .with_character(
                Character::new("c-1", "Alice", StateMode::Active, "loc-1")
                    .with_long_action("travel"),
            )
            .unwrap()
            .with_character(Character::new("c-2", "Bob", StateMode::Active, "loc-1"))
            .unwrap();

        let signals = manager.check(&world, 4).unwrap();
        assert_eq!(signals, vec![InterruptSignal::new("c-1", "woken", 4)]);
    }

    #[test]
    fn test_default_name_is_type_name() {
        let rule = StaticInterruptRule { signals: vec![] };
        assert!(rule.name().ends_with("StaticInterruptRule"));
    }
}
