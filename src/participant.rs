use schema::{Ability, Rule, SkillKind, StatKind, Stats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ParticipantId = String;

/// Which roster a participant fights for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Allies,
    Enemies,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Allies => Side::Enemies,
            Side::Enemies => Side::Allies,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffKind {
    Buff,
    Debuff,
}

/// A timed stat modifier attached to the participant it affects.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Buff {
    pub name: String,
    pub kind: BuffKind,
    pub stat_modifier: BTreeMap<StatKind, i32>,
    pub duration: u32,
    pub remaining_turns: u32,
    // The delta that actually landed after clamping; this is what gets reverted.
    pub applied: BTreeMap<StatKind, i32>,
}

impl Buff {
    pub fn new(name: &str, kind: BuffKind, stat_modifier: BTreeMap<StatKind, i32>, duration: u32) -> Self {
        let duration = duration.max(1);
        Self {
            name: name.to_string(),
            kind,
            stat_modifier,
            duration,
            remaining_turns: duration,
            applied: BTreeMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SkillCooldown {
    pub skill_id: String,
    pub remaining_turns: u32,
}

/// Result of a single HP change, captured for turn records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpChange {
    pub before: u32,
    pub after: u32,
    pub amount: u32,
    pub died: bool,
}

/// A combatant taking part in a battle.
///
/// `current_stats.hp` and `current_stats.mp` always stay within
/// `[0, max_stats.hp]` / `[0, max_stats.mp]`, and a participant is alive
/// exactly while its HP is above zero.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub current_stats: Stats,
    pub max_stats: Stats,
    pub abilities: Vec<Ability>,
    // Empty rules on an enemy hand control to the behavior-pattern AI.
    pub rules: Vec<Rule>,
    pub buffs: Vec<Buff>,
    pub skill_cooldowns: Vec<SkillCooldown>,
    pub is_enemy: bool,
    pub is_boss: bool,
    /// Type/job keywords, e.g. "goblin warrior". Drives AI archetype selection.
    pub job: String,
    pub template_id: Option<String>,
    pub level: u32,
}

impl Participant {
    pub fn new(id: &str, name: &str, stats: Stats) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            current_stats: stats,
            max_stats: stats,
            abilities: Vec::new(),
            rules: Vec::new(),
            buffs: Vec::new(),
            skill_cooldowns: Vec::new(),
            is_enemy: false,
            is_boss: false,
            job: String::new(),
            template_id: None,
            level: 1,
        }
    }

    pub fn with_abilities(mut self, abilities: Vec<Ability>) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_job(mut self, job: &str) -> Self {
        self.job = job.to_string();
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level.max(1);
        self
    }

    pub fn as_enemy(mut self) -> Self {
        self.is_enemy = true;
        self
    }

    pub fn as_boss(mut self) -> Self {
        self.is_enemy = true;
        self.is_boss = true;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.current_stats.hp > 0
    }

    pub fn side(&self) -> Side {
        if self.is_enemy {
            Side::Enemies
        } else {
            Side::Allies
        }
    }

    pub fn hp(&self) -> u32 {
        self.current_stats.hp
    }

    pub fn mp(&self) -> u32 {
        self.current_stats.mp
    }

    /// Current HP as a percentage of max HP (0 when max HP is 0).
    pub fn hp_percent(&self) -> f64 {
        percent(self.current_stats.hp, self.max_stats.hp)
    }

    pub fn mp_percent(&self) -> f64 {
        percent(self.current_stats.mp, self.max_stats.mp)
    }

    // === HP / MP ===

    /// Remove up to `amount` HP. Returns what actually changed.
    pub fn take_damage(&mut self, amount: u32) -> HpChange {
        let before = self.current_stats.hp;
        let after = before.saturating_sub(amount);
        self.current_stats.hp = after;
        let died = before > 0 && after == 0;
        if died {
            self.clear_timed_effects();
        }
        HpChange {
            before,
            after,
            amount: before - after,
            died,
        }
    }

    /// Restore up to `amount` HP, never past max HP. Dead participants are not healed.
    pub fn heal(&mut self, amount: u32) -> HpChange {
        let before = self.current_stats.hp;
        if before == 0 {
            return HpChange {
                before,
                after: before,
                amount: 0,
                died: false,
            };
        }
        let after = before.saturating_add(amount).min(self.max_stats.hp);
        self.current_stats.hp = after;
        HpChange {
            before,
            after,
            amount: after - before,
            died: false,
        }
    }

    pub fn missing_hp(&self) -> u32 {
        self.max_stats.hp.saturating_sub(self.current_stats.hp)
    }

    /// Deduct `cost` MP. Returns false (and leaves MP untouched) if there is not enough.
    pub fn spend_mp(&mut self, cost: u32) -> bool {
        if self.current_stats.mp < cost {
            return false;
        }
        self.current_stats.mp -= cost;
        true
    }

    // === Stats ===

    /// Shift one current stat by `delta`, clamping HP/MP to `[0, max]` and
    /// everything else to `>= 0`. Returns the delta that actually applied.
    pub fn apply_stat_delta(&mut self, stat: StatKind, delta: i32) -> i32 {
        let current = self.current_stats.get(stat) as i64;
        let mut next = (current + delta as i64).max(0);
        match stat {
            StatKind::Hp | StatKind::Mp => next = next.min(self.max_stats.get(stat) as i64),
            _ => next = next.min(u32::MAX as i64),
        }
        self.current_stats.set(stat, next as u32);
        (next - current) as i32
    }

    // === Buffs ===

    /// Attach a buff, applying its modifiers now. A buff with the same name
    /// is reverted and replaced rather than stacked. Returns true if the
    /// application drained HP to zero.
    pub fn apply_buff(&mut self, mut buff: Buff) -> bool {
        let was_alive = self.is_alive();
        if let Some(pos) = self.buffs.iter().position(|b| b.name == buff.name) {
            let old = self.buffs.remove(pos);
            self.revert(&old);
        }
        buff.applied = buff
            .stat_modifier
            .iter()
            .map(|(stat, delta)| (*stat, self.apply_stat_delta(*stat, *delta)))
            .collect();
        let died = was_alive && !self.is_alive();
        if died {
            self.clear_timed_effects();
        } else {
            self.buffs.push(buff);
        }
        died
    }

    fn revert(&mut self, buff: &Buff) {
        for (stat, delta) in &buff.applied {
            self.apply_stat_delta(*stat, -*delta);
        }
    }

    /// Count every buff down by one round, reverting and removing the ones
    /// that ran out. Returns the expired buffs.
    pub fn tick_buffs(&mut self) -> Vec<Buff> {
        let mut expired = Vec::new();
        let mut kept = Vec::with_capacity(self.buffs.len());
        for mut buff in std::mem::take(&mut self.buffs) {
            buff.remaining_turns = buff.remaining_turns.saturating_sub(1);
            if buff.remaining_turns == 0 {
                expired.push(buff);
            } else {
                kept.push(buff);
            }
        }
        self.buffs = kept;
        for buff in &expired {
            self.revert(buff);
        }
        if !self.is_alive() {
            self.clear_timed_effects();
        }
        expired
    }

    pub fn has_buff(&self, name: &str) -> bool {
        self.buffs.iter().any(|b| b.name == name)
    }

    // === Cooldowns ===

    pub fn cooldown_remaining(&self, skill_id: &str) -> Option<u32> {
        self.skill_cooldowns
            .iter()
            .find(|c| c.skill_id == skill_id)
            .map(|c| c.remaining_turns)
    }

    pub fn start_cooldown(&mut self, skill_id: &str, turns: u32) {
        if turns == 0 {
            return;
        }
        match self.skill_cooldowns.iter_mut().find(|c| c.skill_id == skill_id) {
            Some(existing) => existing.remaining_turns = turns,
            None => self.skill_cooldowns.push(SkillCooldown {
                skill_id: skill_id.to_string(),
                remaining_turns: turns,
            }),
        }
    }

    /// Count cooldowns down by one round. Returns the skill ids that became ready.
    pub fn tick_cooldowns(&mut self) -> Vec<String> {
        let mut ready = Vec::new();
        self.skill_cooldowns.retain_mut(|cooldown| {
            cooldown.remaining_turns = cooldown.remaining_turns.saturating_sub(1);
            if cooldown.remaining_turns == 0 {
                ready.push(cooldown.skill_id.clone());
                false
            } else {
                true
            }
        });
        ready
    }

    /// Dead participants stay in the roster but carry no timed effects.
    fn clear_timed_effects(&mut self) {
        self.buffs.clear();
        self.skill_cooldowns.clear();
    }

    // === Abilities ===

    pub fn find_ability(&self, key: &str) -> Option<&Ability> {
        self.abilities
            .iter()
            .find(|a| a.id == key)
            .or_else(|| self.abilities.iter().find(|a| a.matches_key(key)))
    }

    pub fn owns_ability(&self, id: &str) -> bool {
        self.abilities.iter().any(|a| a.id == id)
    }

    /// Combination prerequisites of `ability` that this participant lacks.
    pub fn missing_combinations(&self, ability: &Ability) -> Vec<String> {
        ability
            .combinations
            .iter()
            .filter(|id| !self.owns_ability(id))
            .cloned()
            .collect()
    }

    pub fn has_heal_ability(&self) -> bool {
        self.abilities.iter().any(|a| {
            a.kind == SkillKind::Heal || name_contains_any(&a.name, &["heal", "cure", "regeneration"])
        })
    }

    pub fn has_damage_ability(&self) -> bool {
        self.abilities.iter().any(|a| {
            a.kind == SkillKind::Attack || name_contains_any(&a.name, &["strike", "blast", "bolt", "slash"])
        })
    }

    /// Tank heuristic: defense outweighs strength by more than `ratio`.
    pub fn is_tank(&self, ratio: f64) -> bool {
        let strength = self.current_stats.strength;
        let defense = self.current_stats.defense;
        if strength == 0 {
            return defense > 0;
        }
        defense as f64 / strength as f64 > ratio
    }
}

fn percent(current: u32, max: u32) -> f64 {
    if max == 0 {
        0.0
    } else {
        current as f64 * 100.0 / max as f64
    }
}

fn name_contains_any(name: &str, needles: &[&str]) -> bool {
    let lower = name.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}
