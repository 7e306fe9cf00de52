use crate::stats::StatKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum SkillKind {
    Attack,
    Heal,
    Buff,
    Debuff,
}

/// The payload a skill carries. One variant per effect family, so every
/// consumer has to handle all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillEffect {
    Damage {
        amount: u32,
    },
    Heal {
        amount: u32,
    },
    /// Timed stat change. Used by both Buff and Debuff skills; the skill's
    /// kind decides which one is recorded on the target.
    Modifier {
        modifiers: BTreeMap<StatKind, i32>,
        duration: u32,
    },
    /// Spawns `count` participants of `enemy_type` on the caster's side.
    Summon {
        enemy_type: String,
        count: u32,
        level: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    pub kind: SkillKind,
    #[serde(default)]
    pub mp_cost: u32,
    #[serde(default)]
    pub cooldown: Option<u32>,
    /// Ability ids the caster must also own before this one can be used.
    #[serde(default)]
    pub combinations: Vec<String>,
    pub effect: SkillEffect,
}

impl Ability {
    fn with_effect(id: &str, name: &str, kind: SkillKind, mp_cost: u32, effect: SkillEffect) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            mp_cost,
            cooldown: None,
            combinations: Vec::new(),
            effect,
        }
    }

    pub fn attack(id: &str, name: &str, damage: u32, mp_cost: u32) -> Self {
        Self::with_effect(id, name, SkillKind::Attack, mp_cost, SkillEffect::Damage { amount: damage })
    }

    pub fn heal(id: &str, name: &str, amount: u32, mp_cost: u32) -> Self {
        Self::with_effect(id, name, SkillKind::Heal, mp_cost, SkillEffect::Heal { amount })
    }

    pub fn buff(id: &str, name: &str, modifiers: &[(StatKind, i32)], duration: u32, mp_cost: u32) -> Self {
        Self::with_effect(
            id,
            name,
            SkillKind::Buff,
            mp_cost,
            SkillEffect::Modifier {
                modifiers: modifiers.iter().copied().collect(),
                duration,
            },
        )
    }

    pub fn debuff(id: &str, name: &str, modifiers: &[(StatKind, i32)], duration: u32, mp_cost: u32) -> Self {
        Self::with_effect(
            id,
            name,
            SkillKind::Debuff,
            mp_cost,
            SkillEffect::Modifier {
                modifiers: modifiers.iter().copied().collect(),
                duration,
            },
        )
    }

    /// Summons are Buff-kind skills with a `Summon` payload.
    pub fn summon(id: &str, name: &str, enemy_type: &str, count: u32, level: u32, mp_cost: u32) -> Self {
        Self::with_effect(
            id,
            name,
            SkillKind::Buff,
            mp_cost,
            SkillEffect::Summon {
                enemy_type: enemy_type.to_string(),
                count,
                level,
            },
        )
    }

    pub fn with_cooldown(mut self, turns: u32) -> Self {
        self.cooldown = Some(turns);
        self
    }

    pub fn with_combinations(mut self, required: &[&str]) -> Self {
        self.combinations = required.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn is_summon(&self) -> bool {
        matches!(self.effect, SkillEffect::Summon { .. })
    }

    /// Effective cooldown in rounds; `None` and `Some(0)` both mean "no cooldown".
    pub fn cooldown_turns(&self) -> u32 {
        self.cooldown.unwrap_or(0)
    }

    /// True if `key` names this ability, by id or case-insensitively by name.
    pub fn matches_key(&self, key: &str) -> bool {
        self.id == key || self.name.eq_ignore_ascii_case(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summon_is_buff_kind() {
        let summon = Ability::summon("call_whelps", "Call Whelps", "whelp", 2, 1, 10);
        assert_eq!(summon.kind, SkillKind::Buff);
        assert!(summon.is_summon());
    }

    #[test]
    fn test_matches_key_by_id_or_name() {
        let fireball = Ability::attack("fireball", "Fire Ball", 30, 5);
        assert!(fireball.matches_key("fireball"));
        assert!(fireball.matches_key("fire ball"));
        assert!(!fireball.matches_key("fire"));
    }

    #[test]
    fn test_ability_parses_from_ron() {
        let src = r#"(
            id: "war_cry",
            name: "War Cry",
            kind: Buff,
            mp_cost: 4,
            cooldown: Some(3),
            effect: Modifier(modifiers: { Str: 5, Def: -2 }, duration: 2),
        )"#;
        let ability: Ability = ron::from_str(src).unwrap();
        assert_eq!(ability.cooldown_turns(), 3);
        assert!(ability.combinations.is_empty());
        match ability.effect {
            SkillEffect::Modifier { modifiers, duration } => {
                assert_eq!(modifiers.get(&StatKind::Str), Some(&5));
                assert_eq!(modifiers.get(&StatKind::Def), Some(&-2));
                assert_eq!(duration, 2);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }
}
