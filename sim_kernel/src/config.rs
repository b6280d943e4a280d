//! Orchestrator configuration.
//!
//! These knobs decide *when* the orchestrator advances the clock, checkpoints,
//! and calls `settle`/`check`. The kernel itself never reads them; every value
//! reaches it as an explicit argument.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tick cadence and run length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// In-world hours represented by one tick.
    pub tick_unit_hours: u32,
    pub max_ticks: u64,
    /// Ticks between persisted world snapshots.
    pub checkpoint_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_unit_hours: 24,
            max_ticks: 365,
            checkpoint_interval: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NarratorConfig {
    /// Attempts at re-proposing a rejected action before falling back.
    pub max_retry: u32,
    pub instant_mode_max_rounds: u32,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            max_retry: 2,
            instant_mode_max_rounds: 5,
        }
    }
}

/// Weights of the spotlight score that promotes characters between state modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpotlightWeights {
    pub geo: f64,
    pub relation: f64,
    pub availability: f64,
    pub narrative_importance: f64,
    pub random_noise: f64,
}

impl Default for SpotlightWeights {
    fn default() -> Self {
        Self {
            geo: 0.3,
            relation: 0.25,
            availability: 0.15,
            narrative_importance: 0.2,
            random_noise: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpotlightConfig {
    pub weights: SpotlightWeights,
    /// Score at or above which a character becomes ACTIVE.
    pub threshold_active: f64,
    /// Score at or above which a character stays PASSIVE rather than DORMANT.
    pub threshold_passive: f64,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            weights: SpotlightWeights::default(),
            threshold_active: 0.7,
            threshold_passive: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhenologyConfig {
    pub enabled_effects: Vec<String>,
}

impl Default for PhenologyConfig {
    fn default() -> Self {
        Self {
            enabled_effects: vec!["seasonal_growth".to_string()],
        }
    }
}

/// Complete orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelConfig {
    pub simulation: SimulationConfig,
    pub narrator: NarratorConfig,
    pub spotlight: SpotlightConfig,
    pub phenology: PhenologyConfig,
}

impl KernelConfig {
    /// Parse and validate a TOML document. `${NAME}` tokens are left as-is.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, resolving `${NAME}` tokens in string values first.
    ///
    /// `lookup` supplies variable values, e.g. `|name| std::env::var(name).ok()`.
    /// An unresolved token fails with [`ConfigError::MissingEnv`].
    pub fn from_toml_str_with_env<F>(source: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut table: toml::Table = source.parse()?;
        for (_, value) in table.iter_mut() {
            resolve_env(value, &lookup)?;
        }

        let config: KernelConfig = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cadence values, spotlight weights and thresholds, and phenology effects.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let simulation = &self.simulation;
        if simulation.tick_unit_hours == 0 {
            return Err(invalid("simulation.tick_unit_hours must be > 0"));
        }
        if simulation.max_ticks == 0 {
            return Err(invalid("simulation.max_ticks must be > 0"));
        }
        if simulation.checkpoint_interval == 0 {
            return Err(invalid("simulation.checkpoint_interval must be > 0"));
        }
        if self.narrator.instant_mode_max_rounds == 0 {
            return Err(invalid("narrator.instant_mode_max_rounds must be > 0"));
        }

        let spotlight = &self.spotlight;
        let weights = &spotlight.weights;
        for (name, value) in [
            ("weights.geo", weights.geo),
            ("weights.relation", weights.relation),
            ("weights.availability", weights.availability),
            ("weights.narrative_importance", weights.narrative_importance),
            ("weights.random_noise", weights.random_noise),
            ("threshold_active", spotlight.threshold_active),
            ("threshold_passive", spotlight.threshold_passive),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "spotlight.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if spotlight.threshold_active <= spotlight.threshold_passive {
            return Err(invalid(
                "threshold_active must be greater than threshold_passive",
            ));
        }

        if self.phenology.enabled_effects.is_empty() {
            return Err(invalid("phenology.enabled_effects must not be empty"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn resolve_env<F>(value: &mut toml::Value, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        toml::Value::String(text) => *text = replace_env_tokens(text, lookup)?,
        toml::Value::Array(items) => {
            for item in items {
                resolve_env(item, lookup)?;
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                resolve_env(item, lookup)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Matches `${NAME}` with NAME = `[A-Z0-9_]+`.
fn env_pattern() -> &'static Regex {
    static ENV_PATTERN: OnceLock<Regex> = OnceLock::new();
    ENV_PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Z0-9_]+)\}").expect("env token pattern compiles"))
}

/// Replace every `${NAME}` token in `text`. Anything else is kept literally.
fn replace_env_tokens<F>(text: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = env_pattern();

    // Resolve first so a missing variable surfaces as an error.
    let mut values: BTreeMap<String, String> = BTreeMap::new();
    for captures in pattern.captures_iter(text) {
        let name = &captures[1];
        if !values.contains_key(name) {
            let value = lookup(name).ok_or_else(|| ConfigError::MissingEnv(name.to_string()))?;
            values.insert(name.to_string(), value);
        }
    }

    let resolved = pattern.replace_all(text, |captures: &Captures<'_>| {
        values.get(&captures[1]).cloned().unwrap_or_default()
    });
    Ok(resolved.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[simulation]
tick_unit_hours = 6
max_ticks = 1000
checkpoint_interval = 25

[narrator]
max_retry = 3
instant_mode_max_rounds = 4

[spotlight]
threshold_active = 0.8
threshold_passive = 0.4

[spotlight.weights]
geo = 0.3
relation = 0.3
availability = 0.1
narrative_importance = 0.2
random_noise = 0.1

[phenology]
enabled_effects = ["${SEASON_EFFECT}", "frost"]
"#;

    fn env(name: &str) -> Option<String> {
        match name {
            "SEASON_EFFECT" => Some("bloom".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(KernelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_with_env() {
        let config = KernelConfig::from_toml_str_with_env(SAMPLE, env).unwrap();

        assert_eq!(config.simulation.tick_unit_hours, 6);
        assert_eq!(config.simulation.checkpoint_interval, 25);
        assert_eq!(config.narrator.max_retry, 3);
        assert_eq!(config.spotlight.threshold_active, 0.8);
        assert_eq!(config.phenology.enabled_effects, vec!["bloom", "frost"]);
    }

    #[test]
    fn test_parse_without_env_keeps_tokens() {
        let config = KernelConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.phenology.enabled_effects[0], "${SEASON_EFFECT}");
    }

    #[test]
    fn test_missing_env() {
        let err = KernelConfig::from_toml_str_with_env(SAMPLE, |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(name) if name == "SEASON_EFFECT"));
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let source = SAMPLE.replace("threshold_active = 0.8", "threshold_active = 0.4");
        let err = KernelConfig::from_toml_str_with_env(&source, env).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_zero_cadence() {
        let source = SAMPLE.replace("tick_unit_hours = 6", "tick_unit_hours = 0");
        assert!(KernelConfig::from_toml_str_with_env(&source, env).is_err());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let source = SAMPLE.replace("max_retry = 3", "max_retry = 3\nretries = 1");
        assert!(matches!(
            KernelConfig::from_toml_str_with_env(&source, env),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_replace_env_tokens() {
        assert_eq!(
            replace_env_tokens("a-${SEASON_EFFECT}-b", &env).unwrap(),
            "a-bloom-b"
        );
        assert_eq!(replace_env_tokens("${lower}", &env).unwrap(), "${lower}");
        assert_eq!(replace_env_tokens("cost ${", &env).unwrap(), "cost ${");
        assert_eq!(replace_env_tokens("${}", &env).unwrap(), "${}");
    }

    #[test]
    fn test_replace_env_tokens_repeated_and_literal_values() {
        let lookup = |name: &str| match name {
            "PRICE" => Some("$1".to_string()),
            "UNIT" => Some("coin".to_string()),
            _ => None,
        };
        assert_eq!(
            replace_env_tokens("${PRICE} ${UNIT}, ${PRICE} ${UNIT}", &lookup).unwrap(),
            "$1 coin, $1 coin"
        );
    }

    #[test]
    fn test_replace_env_tokens_reports_first_missing() {
        let err = replace_env_tokens("${SEASON_EFFECT}/${NOPE}", &env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(name) if name == "NOPE"));
    }
}
