use crate::collaborators::{LootSummary, LootSystem};
use crate::participant::Participant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const GOLD_PER_LEVEL: u32 = 10;
const EXPERIENCE_PER_LEVEL: u32 = 5;
const BOSS_MULTIPLIER: u32 = 3;

/// Fixed reward table. The same defeated roster always yields the same loot.
///
/// Per enemy: gold `10 * level`, experience `max_hp / 2 + 5 * level`, both
/// tripled for bosses. Items come from the drop list of the enemy's template:
/// the first entry for regular enemies, the whole list for bosses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RewardTable {
    pub drops: BTreeMap<String, Vec<String>>,
}

impl Default for RewardTable {
    fn default() -> Self {
        let drops = [
            ("goblin", vec!["Rusty Dagger"]),
            ("goblin_shaman", vec!["Herb Pouch", "Bone Charm"]),
            ("slime", vec!["Slime Jelly"]),
            ("orc_guardian", vec!["Iron Shield"]),
            ("dragon", vec!["Dragon Scale", "Dragon Heart"]),
            ("whelp", vec!["Small Scale"]),
        ]
        .into_iter()
        .map(|(kind, items)| (kind.to_string(), items.into_iter().map(String::from).collect()))
        .collect();
        Self { drops }
    }
}

impl RewardTable {
    pub fn empty() -> Self {
        Self { drops: BTreeMap::new() }
    }

    fn drops_for(&self, enemy: &Participant) -> &[String] {
        enemy
            .template_id
            .as_deref()
            .and_then(|template| self.drops.get(template))
            .map_or(&[], Vec::as_slice)
    }
}

impl LootSystem for RewardTable {
    fn generate_battle_loot(&self, defeated_enemies: &[Participant]) -> LootSummary {
        let mut summary = LootSummary::default();
        for enemy in defeated_enemies {
            let multiplier = if enemy.is_boss { BOSS_MULTIPLIER } else { 1 };
            let gold = GOLD_PER_LEVEL.saturating_mul(enemy.level);
            let experience = (enemy.max_stats.hp / 2).saturating_add(EXPERIENCE_PER_LEVEL.saturating_mul(enemy.level));
            summary.total_gold = summary.total_gold.saturating_add(gold.saturating_mul(multiplier));
            summary.total_experience = summary
                .total_experience
                .saturating_add(experience.saturating_mul(multiplier));

            let drops = self.drops_for(enemy);
            if enemy.is_boss {
                summary.items.extend(drops.iter().cloned());
            } else if let Some(first) = drops.first() {
                summary.items.push(first.clone());
            }
        }
        tracing::debug!(
            gold = summary.total_gold,
            experience = summary.total_experience,
            items = summary.items.len(),
            "battle loot generated"
        );
        summary
    }
}
