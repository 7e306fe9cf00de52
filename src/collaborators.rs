//! Interfaces the engine consumes but does not implement itself.
//!
//! `factory::TemplateFactory` and `loot::RewardTable` are the in-crate
//! implementations; hosts can plug in their own.

use crate::battle::state::TurnResult;
use crate::errors::FactoryError;
use crate::participant::Participant;
use schema::Rule;
use serde::{Deserialize, Serialize};

/// A party member as authored in a campaign file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PartyMemberDef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    /// Template key the factory builds from.
    pub template: String,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Overrides the template's rules when non-empty.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// One enemy group in a battle definition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleEnemyDef {
    pub enemy_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_level() -> u32 {
    1
}

fn default_count() -> u32 {
    1
}

/// Builds participants from static definitions. Used for initial rosters
/// and by summon skills mid-battle.
pub trait EntityFactory {
    fn create_character(&mut self, def: &PartyMemberDef) -> Result<Participant, FactoryError>;

    fn create_enemy(&mut self, enemy_type: &str, name: Option<&str>, level: u32) -> Result<Participant, FactoryError>;

    fn create_enemies_from_battle(&mut self, defs: &[BattleEnemyDef]) -> Result<Vec<Participant>, FactoryError> {
        let mut enemies = Vec::new();
        for def in defs {
            for _ in 0..def.count {
                enemies.push(self.create_enemy(&def.enemy_type, def.name.as_deref(), def.level)?);
            }
        }
        Ok(enemies)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LootSummary {
    pub total_gold: u32,
    pub total_experience: u32,
    pub items: Vec<String>,
}

pub trait LootSystem {
    fn generate_battle_loot(&self, defeated_enemies: &[Participant]) -> LootSummary;
}

/// Observer for battle progress. Must not influence the simulation.
pub trait BattleLogger {
    fn log_turn(&self, turn: &TurnResult);
    fn log_debug(&self, category: &str, message: &str);
    fn log_error(&self, category: &str, message: &str);
}

/// Forwards battle logging to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl BattleLogger for TracingLogger {
    fn log_turn(&self, turn: &TurnResult) {
        tracing::info!(
            turn = turn.turn_number,
            actor = %turn.actor_name,
            action = %turn.action,
            success = turn.success,
            "{}",
            turn.message
        );
    }

    fn log_debug(&self, category: &str, message: &str) {
        tracing::debug!(category, "{}", message);
    }

    fn log_error(&self, category: &str, message: &str) {
        tracing::error!(category, "{}", message);
    }
}
