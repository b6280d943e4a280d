//! Rule Engine - deterministic settlement of registered rules over a world snapshot.
//!
//! A settlement pass works as follows:
//! 1. **Order**: Rules run by priority ascending, ties broken by registration order
//! 2. **Match**: Each rule decides whether it applies to the snapshot and context
//! 3. **Apply**: Matched rules return declarative state changes, never mutating the world
//! 4. **Audit**: Every rule gets one execution record, matched or not
//!
//! Registration happens once through [`RuleEngineBuilder`]; the built engine is
//! frozen and can be shared between sessions and threads.

mod audit;

pub use audit::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use world_model::{Action, Properties, Seed, StateChange, Tick, WorldState};

use crate::error::{KernelError, Result, RuleError, RuleStage};

/// Per-call input to a settlement pass. Built fresh for every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleContext {
    pub tick: Tick,
    /// Seed forked for this pass; rules needing randomness derive from it.
    pub seed: Seed,
    /// The validated action being settled, if any.
    #[serde(default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub metadata: Properties,
}

impl RuleContext {
    /// Context for `tick` with no action and empty metadata.
    pub fn new(tick: Tick, seed: Seed) -> Self {
        Self {
            tick,
            seed,
            action: None,
            metadata: Properties::new(),
        }
    }

    /// Attach the action being settled.
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Insert one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A settlement rule.
///
/// Rules see the world only through a shared reference and communicate effects
/// solely through the returned [`StateChange`]s. `name` and `priority` are read
/// once at registration and must not change afterwards.
pub trait Rule: Send + Sync {
    /// Unique, non-empty name used in audit records and failures.
    fn name(&self) -> &str;

    /// Lower runs earlier.
    fn priority(&self) -> i32;

    fn matches(
        &self,
        world: &WorldState,
        context: &RuleContext,
    ) -> std::result::Result<bool, RuleError>;

    fn apply(
        &self,
        world: &WorldState,
        context: &RuleContext,
    ) -> std::result::Result<Vec<StateChange>, RuleError>;
}

struct RegisteredRule {
    name: String,
    priority: i32,
    index: usize,
    rule: Box<dyn Rule>,
}

impl RegisteredRule {
    fn failure(&self, stage: RuleStage, source: RuleError) -> KernelError {
        tracing::warn!(
            rule = %self.name,
            priority = self.priority,
            %stage,
            error = %source,
            "rule failed, aborting settlement pass"
        );
        KernelError::RuleFailure {
            rule_name: self.name.clone(),
            priority: self.priority,
            stage,
            source,
        }
    }
}

/// Accumulates rules during startup.
#[derive(Default)]
pub struct RuleEngineBuilder {
    rules: Vec<RegisteredRule>,
}

impl RuleEngineBuilder {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to the registry.
    ///
    /// Fails if the rule's name is empty.
    pub fn register(self, rule: impl Rule + 'static) -> Result<Self> {
        self.register_boxed(Box::new(rule))
    }

    /// Same as [`RuleEngineBuilder::register`] for an already boxed rule.
    pub fn register_boxed(mut self, rule: Box<dyn Rule>) -> Result<Self> {
        let name = rule.name().to_string();
        if name.is_empty() {
            return Err(KernelError::Construction(
                "rule name must not be empty".to_string(),
            ));
        }

        let priority = rule.priority();
        let index = self.rules.len();
        tracing::debug!(rule = %name, priority, index, "rule registered");
        self.rules.push(RegisteredRule {
            name,
            priority,
            index,
            rule,
        });
        Ok(self)
    }

    /// Freeze the registry into an engine with its execution order fixed.
    pub fn build(mut self) -> RuleEngine {
        self.rules.sort_by_key(|entry| (entry.priority, entry.index));
        RuleEngine {
            rules: self.rules.into(),
        }
    }
}

/// Frozen rule registry. Cheap to clone; all clones share the same rules.
#[derive(Clone)]
pub struct RuleEngine {
    rules: Arc<[RegisteredRule]>,
}

impl RuleEngine {
    /// Start registering rules.
    pub fn builder() -> RuleEngineBuilder {
        RuleEngineBuilder::new()
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule names in execution order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|entry| entry.name.as_str())
    }

    /// Run one settlement pass.
    ///
    /// Either every rule runs and the complete result is returned, or the first
    /// failing rule aborts the pass with [`KernelError::RuleFailure`]. A change
    /// with an empty path or reason counts as a failure of the rule that returned it.
    pub fn settle(&self, world: &WorldState, context: &RuleContext) -> Result<RuleEngineResult> {
        let mut state_changes = Vec::new();
        let mut audit_log = Vec::with_capacity(self.rules.len());

        for entry in self.rules.iter() {
            let matched = entry
                .rule
                .matches(world, context)
                .map_err(|source| entry.failure(RuleStage::Match, source))?;

            let changes = if matched {
                let changes = entry
                    .rule
                    .apply(world, context)
                    .map_err(|source| entry.failure(RuleStage::Apply, source))?;
                for change in &changes {
                    change
                        .validate()
                        .map_err(|err| entry.failure(RuleStage::Apply, Box::new(err)))?;
                }
                changes
            } else {
                Vec::new()
            };

            tracing::debug!(
                rule = %entry.name,
                priority = entry.priority,
                matched,
                changes = changes.len(),
                "rule evaluated"
            );

            audit_log.push(RuleExecutionRecord {
                rule_name: entry.name.clone(),
                priority: entry.priority,
                matched,
                state_change_count: changes.len(),
            });
            state_changes.extend(changes);
        }

        tracing::debug!(
            tick = context.tick,
            rules = audit_log.len(),
            changes = state_changes.len(),
            "settlement pass complete"
        );

        Ok(RuleEngineResult::new(state_changes, audit_log))
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use world_model::{Character, StateMode};

    struct StubRule {
        name: String,
        priority: i32,
        matched: bool,
        changes: Vec<StateChange>,
    }

    impl StubRule {
        fn new(name: &str, priority: i32, matched: bool, changes: Vec<StateChange>) -> Self {
            Self {
                name: name.to_string(),
                priority,
                matched,
                changes,
            }
        }
    }

    impl Rule for StubRule {
        fn name(&self) -> &str {
            &self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn matches(&self, _: &WorldState, _: &RuleContext) -> std::result::Result<bool, RuleError> {
            Ok(self.matched)
        }

        fn apply(
            &self,
            _: &WorldState,
            _: &RuleContext,
        ) -> std::result::Result<Vec<StateChange>, RuleError> {
            Ok(self.changes.clone())
        }
    }

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    /// Matches, then fails in `apply`. Counts how often it was asked to match.
    struct ExplodingRule {
        match_calls: Arc<AtomicUsize>,
    }

    impl Rule for ExplodingRule {
        fn name(&self) -> &str {
            "exploding"
        }

        fn priority(&self) -> i32 {
            3
        }

        fn matches(&self, _: &WorldState, _: &RuleContext) -> std::result::Result<bool, RuleError> {
            self.match_calls.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        fn apply(
            &self,
            _: &WorldState,
            _: &RuleContext,
        ) -> std::result::Result<Vec<StateChange>, RuleError> {
            Err(Box::new(Boom))
        }
    }

    fn build_world() -> WorldState {
        WorldState::new(5, 2026)
            .with_character(Character::new("c-1", "Alice", StateMode::Passive, "loc-1"))
            .unwrap()
    }

    fn change(rule_name: &str, before: f64, after: f64) -> StateChange {
        StateChange::resource(rule_name, before, after, rule_name)
    }

    #[test]
    fn test_orders_by_priority_then_registration() {
        let engine = RuleEngine::builder()
            .register(StubRule::new("early", 5, true, vec![change("early", 1.0, 2.0)]))
            .unwrap()
            .register(StubRule::new("first", 1, true, vec![change("first", 0.0, 1.0)]))
            .unwrap()
            .register(StubRule::new("late", 5, true, vec![change("late", 2.0, 3.0)]))
            .unwrap()
            .build();

        let result = engine.settle(&build_world(), &RuleContext::new(6, 2026)).unwrap();

        let audit: Vec<_> = result.audit_log().iter().map(|r| r.rule_name.as_str()).collect();
        let reasons: Vec<_> = result.state_changes().iter().map(|c| c.reason.as_str()).collect();
        assert_eq!(audit, vec!["first", "early", "late"]);
        assert_eq!(reasons, vec!["first", "early", "late"]);
        assert_eq!(engine.rule_names().collect::<Vec<_>>(), vec!["first", "early", "late"]);
    }

    #[test]
    fn test_audits_unmatched_rule() {
        let engine = RuleEngine::builder()
            .register(StubRule::new("noop", 0, false, vec![change("noop", 0.0, 1.0)]))
            .unwrap()
            .build();

        let result = engine.settle(&build_world(), &RuleContext::new(6, 2026)).unwrap();

        assert!(result.state_changes().is_empty());
        assert_eq!(
            result.audit_log(),
            &[RuleExecutionRecord {
                rule_name: "noop".to_string(),
                priority: 0,
                matched: false,
                state_change_count: 0,
            }]
        );
    }

    #[test]
    fn test_keeps_change_order_within_rule() {
        let engine = RuleEngine::builder()
            .register(StubRule::new(
                "harvest",
                0,
                true,
                vec![change("grain", 1.0, 5.0), change("straw", 0.0, 2.0)],
            ))
            .unwrap()
            .build();

        let result = engine.settle(&build_world(), &RuleContext::new(6, 2026)).unwrap();
        let paths: Vec<_> = result.state_changes().iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["resources.grain", "resources.straw"]);
        assert_eq!(result.audit_log()[0].state_change_count, 2);
    }

    #[test]
    fn test_is_deterministic_for_same_input() {
        let engine = RuleEngine::builder()
            .register(StubRule::new("stable", 1, true, vec![change("stable", 3.0, 4.0)]))
            .unwrap()
            .build();
        let world = build_world();
        let context = RuleContext::new(6, 2026);

        assert_eq!(
            engine.settle(&world, &context).unwrap(),
            engine.settle(&world, &context).unwrap()
        );
    }

    #[test]
    fn test_rejects_empty_name() {
        let result = RuleEngine::builder().register(StubRule::new("", 0, true, vec![]));
        assert!(matches!(result, Err(KernelError::Construction(_))));
    }

    #[test]
    fn test_failure_aborts_pass() {
        let match_calls = Arc::new(AtomicUsize::new(0));
        let engine = RuleEngine::builder()
            .register(StubRule::new("before", 1, true, vec![change("before", 0.0, 1.0)]))
            .unwrap()
            .register(ExplodingRule {
                match_calls: Arc::clone(&match_calls),
            })
            .unwrap()
            .register(StubRule::new("after", 9, true, vec![change("after", 0.0, 1.0)]))
            .unwrap()
            .build();
        let world = build_world();

        let err = engine.settle(&world, &RuleContext::new(6, 2026)).unwrap_err();

        match &err {
            KernelError::RuleFailure {
                rule_name,
                priority,
                stage,
                source,
            } => {
                assert_eq!(rule_name, "exploding");
                assert_eq!(*priority, 3);
                assert_eq!(*stage, RuleStage::Apply);
                assert!(source.is::<Boom>());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.rule_error().map(|e| e.to_string()), Some("boom".to_string()));
        assert_eq!(match_calls.load(Ordering::SeqCst), 1);
        assert_eq!(world, build_world());
    }

    #[test]
    fn test_malformed_change_fails_rule() {
        let malformed = StateChange::new("", serde_json::json!(1), serde_json::json!(2), "");
        let engine = RuleEngine::builder()
            .register(StubRule::new("ok", 1, true, vec![change("ok", 0.0, 1.0)]))
            .unwrap()
            .register(StubRule::new("sloppy", 4, true, vec![malformed]))
            .unwrap()
            .build();

        let err = engine.settle(&build_world(), &RuleContext::new(6, 2026)).unwrap_err();
        match &err {
            KernelError::RuleFailure {
                rule_name,
                priority,
                stage,
                source,
            } => {
                assert_eq!(rule_name, "sloppy");
                assert_eq!(*priority, 4);
                assert_eq!(*stage, RuleStage::Apply);
                assert!(source.is::<world_model::ModelError>());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_engine() {
        let engine = RuleEngine::builder().build();
        assert!(engine.is_empty());

        let result = engine.settle(&build_world(), &RuleContext::new(0, 1)).unwrap();
        assert_eq!(result, RuleEngineResult::default());
    }

    #[test]
    fn test_context_builder() {
        let context = RuleContext::new(3, 42)
            .with_action(world_model::Action::new("c-1", "rest"))
            .with_metadata("scene", serde_json::json!("tavern"));

        assert_eq!(context.action.as_ref().map(|a| a.action_type.as_str()), Some("rest"));
        assert_eq!(context.metadata["scene"], "tavern");
    }
}
