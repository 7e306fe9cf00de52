use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for a battle. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BattleConfig {
    /// Turn cap used by `simulate_full_battle` when the caller passes none.
    pub max_turns: u32,
    /// Seeds the battle RNG; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Damage and heal rolls add a value in `[0, damage_jitter)`.
    pub damage_jitter: u32,
    /// Initiative is speed plus a value in `[0, initiative_jitter)`.
    pub initiative_jitter: u32,
    pub heal_magic_factor: f64,
    /// `def / str` above this marks a participant as a tank.
    pub tank_ratio: f64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            max_turns: 100,
            seed: None,
            damage_jitter: 5,
            initiative_jitter: 10,
            heal_magic_factor: 0.5,
            tank_ratio: 1.2,
        }
    }
}

impl BattleConfig {
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid("max_turns must be at least 1".to_string()));
        }
        if !(self.heal_magic_factor >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "heal_magic_factor must be non-negative, got {}",
                self.heal_magic_factor
            )));
        }
        if !(self.tank_ratio > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tank_ratio must be positive, got {}",
                self.tank_ratio
            )));
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
