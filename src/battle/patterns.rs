//! Behavior pattern catalog for rule-less enemies.
//!
//! Each archetype owns a short list of named patterns. A pattern is usable
//! when any of its gate conditions holds; among usable patterns the one with
//! the highest `priority + adaptive bonus` wins.
//!
//! # Archetypes
//!
//! - **Aggressive**: warriors and fighters. Hit the weakest target hard.
//! - **Defensive**: tanks and guardians. Debuff the biggest threat, shore up
//!   when hurt.
//! - **Healing**: healers and clerics. Keep the party standing.
//! - **Support**: mages and wizards. Buff early, hex crowds, blast otherwise.
//! - **Boss**: anything flagged as a boss. Summon, then enrage when wounded.
//! - **Adaptive**: everything else. Opportunistic.

use crate::battle::conditions::Condition;
use crate::battle::targeting::TargetKind;
use crate::participant::Participant;
use schema::SkillKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{Display, EnumIter};
use ActionPreference::{AnyOfKind, Attack, Summon};
use TargetKind::*;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Archetype {
    Aggressive,
    Defensive,
    Healing,
    Support,
    Boss,
    Adaptive,
}

/// One entry in a pattern's ordered action wish list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ActionPreference {
    Attack,
    /// A specific ability by id.
    Skill(String),
    /// The first usable ability of this kind. Summons are excluded from `Buff`.
    AnyOfKind(SkillKind),
    /// The first usable summon ability.
    Summon,
}

/// A conditional tweak on top of a pattern. Overrides replace the pattern's
/// lists wholesale; bonuses add to its score.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveRule {
    pub condition: Condition,
    pub priority_bonus: f32,
    pub targets: Option<Vec<TargetKind>>,
    pub actions: Option<Vec<ActionPreference>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorPattern {
    pub name: String,
    pub priority: f32,
    pub gates: Vec<Condition>,
    pub targets: Vec<TargetKind>,
    pub actions: Vec<ActionPreference>,
    pub adaptive: Vec<AdaptiveRule>,
}

impl BehaviorPattern {
    fn new(name: &str, priority: f32, gates: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            priority,
            gates: gates.iter().map(|g| Condition::parse(g)).collect(),
            targets: Vec::new(),
            actions: Vec::new(),
            adaptive: Vec::new(),
        }
    }

    fn targets(mut self, targets: &[TargetKind]) -> Self {
        self.targets = targets.to_vec();
        self
    }

    fn actions(mut self, actions: Vec<ActionPreference>) -> Self {
        self.actions = actions;
        self
    }

    fn adapt(mut self, rule: AdaptiveRule) -> Self {
        self.adaptive.push(rule);
        self
    }
}

impl AdaptiveRule {
    fn when(condition: &str, priority_bonus: f32) -> Self {
        Self {
            condition: Condition::parse(condition),
            priority_bonus,
            targets: None,
            actions: None,
        }
    }

    fn targets(mut self, targets: &[TargetKind]) -> Self {
        self.targets = Some(targets.to_vec());
        self
    }

    fn actions(mut self, actions: Vec<ActionPreference>) -> Self {
        self.actions = Some(actions);
        self
    }
}

/// Patterns grouped by archetype, in evaluation order.
#[derive(Debug, Clone)]
pub struct BehaviorCatalog {
    patterns: HashMap<Archetype, Vec<BehaviorPattern>>,
}

impl BehaviorCatalog {
    pub fn empty() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    pub fn insert(&mut self, archetype: Archetype, pattern: BehaviorPattern) {
        self.patterns.entry(archetype).or_default().push(pattern);
    }

    pub fn patterns_for(&self, archetype: Archetype) -> &[BehaviorPattern] {
        self.patterns.get(&archetype).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();

        // ====================================================================
        // Aggressive
        // ====================================================================
        catalog.insert(
            Archetype::Aggressive,
            BehaviorPattern::new("berserker", 60.0, &["always"])
                .targets(&[WeakestEnemy, RandomEnemy])
                .actions(vec![AnyOfKind(SkillKind::Attack), Attack])
                .adapt(
                    AdaptiveRule::when("self.hp < 30%", 0.0)
                        .targets(&[SelfTarget])
                        .actions(vec![AnyOfKind(SkillKind::Buff), AnyOfKind(SkillKind::Heal), Attack]),
                ),
        );
        catalog.insert(
            Archetype::Aggressive,
            BehaviorPattern::new("finisher", 55.0, &["enemy.hp < 25%"])
                .targets(&[LowestHpEnemy])
                .actions(vec![AnyOfKind(SkillKind::Attack), Attack])
                .adapt(AdaptiveRule::when("enemy.count < 2", 10.0)),
        );

        // ====================================================================
        // Defensive
        // ====================================================================
        catalog.insert(
            Archetype::Defensive,
            BehaviorPattern::new("bulwark", 50.0, &["always"])
                .targets(&[StrongestEnemy])
                .actions(vec![AnyOfKind(SkillKind::Debuff), Attack])
                .adapt(
                    AdaptiveRule::when("self.hp < 50%", 5.0)
                        .targets(&[SelfTarget])
                        .actions(vec![AnyOfKind(SkillKind::Buff), AnyOfKind(SkillKind::Heal), Attack]),
                ),
        );
        catalog.insert(
            Archetype::Defensive,
            BehaviorPattern::new("guard", 55.0, &["ally.hp < 40%"])
                .targets(&[LowestHpAlly])
                .actions(vec![AnyOfKind(SkillKind::Buff), AnyOfKind(SkillKind::Heal), Attack]),
        );

        // ====================================================================
        // Healing
        // ====================================================================
        catalog.insert(
            Archetype::Healing,
            BehaviorPattern::new("mender", 70.0, &["ally.hp < 50%"])
                .targets(&[LowestHpAlly])
                .actions(vec![AnyOfKind(SkillKind::Heal), AnyOfKind(SkillKind::Buff)]),
        );
        catalog.insert(
            Archetype::Healing,
            BehaviorPattern::new("zealot", 40.0, &["always"])
                .targets(&[WeakestEnemy, RandomEnemy])
                .actions(vec![AnyOfKind(SkillKind::Debuff), AnyOfKind(SkillKind::Attack), Attack]),
        );

        // ====================================================================
        // Support
        // ====================================================================
        catalog.insert(
            Archetype::Support,
            BehaviorPattern::new("enchanter", 60.0, &["turn < 4"])
                .targets(&[StrongestAlly])
                .actions(vec![AnyOfKind(SkillKind::Buff)]),
        );
        catalog.insert(
            Archetype::Support,
            BehaviorPattern::new("hexer", 55.0, &["enemy.count > 1"])
                .targets(&[StrongestEnemy])
                .actions(vec![AnyOfKind(SkillKind::Debuff), AnyOfKind(SkillKind::Attack), Attack]),
        );
        catalog.insert(
            Archetype::Support,
            BehaviorPattern::new("blaster", 45.0, &["always"])
                .targets(&[WeakestEnemy])
                .actions(vec![AnyOfKind(SkillKind::Attack), Attack])
                .adapt(AdaptiveRule::when("self.mp < 20%", 0.0).actions(vec![Attack])),
        );

        // ====================================================================
        // Boss
        // ====================================================================
        catalog.insert(
            Archetype::Boss,
            BehaviorPattern::new("overlord", 80.0, &["always"])
                .targets(&[StrongestEnemy, RandomEnemy])
                .actions(vec![Summon, AnyOfKind(SkillKind::Debuff), AnyOfKind(SkillKind::Attack), Attack]),
        );
        catalog.insert(
            Archetype::Boss,
            BehaviorPattern::new("enrage", 75.0, &["self.hp < 50%"])
                .targets(&[WeakestEnemy])
                .actions(vec![AnyOfKind(SkillKind::Attack), Attack])
                .adapt(
                    AdaptiveRule::when("self.hp < 25%", 20.0)
                        .targets(&[SelfTarget])
                        .actions(vec![
                            AnyOfKind(SkillKind::Heal),
                            AnyOfKind(SkillKind::Buff),
                            AnyOfKind(SkillKind::Attack),
                        ]),
                ),
        );

        // ====================================================================
        // Adaptive
        // ====================================================================
        catalog.insert(
            Archetype::Adaptive,
            BehaviorPattern::new("opportunist", 50.0, &["enemy.hp < 30%"])
                .targets(&[LowestHpEnemy])
                .actions(vec![AnyOfKind(SkillKind::Attack), Attack]),
        );
        catalog.insert(
            Archetype::Adaptive,
            BehaviorPattern::new("survivor", 45.0, &["self.hp < 40%"])
                .targets(&[SelfTarget])
                .actions(vec![AnyOfKind(SkillKind::Heal), AnyOfKind(SkillKind::Buff), Attack])
                .adapt(AdaptiveRule::when("self.hp < 20%", 30.0)),
        );
        catalog.insert(
            Archetype::Adaptive,
            BehaviorPattern::new("brawler", 30.0, &["always"])
                .targets(&[RandomEnemy])
                .actions(vec![AnyOfKind(SkillKind::Attack), Attack]),
        );

        catalog
    }
}

/// Pick the archetype for an enemy from its job and name keywords.
/// Bosses are always `Boss`.
pub fn archetype_for(participant: &Participant) -> Archetype {
    if participant.is_boss {
        return Archetype::Boss;
    }
    let haystack = format!("{} {}", participant.job, participant.name).to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| haystack.contains(w));

    if has(&["healer", "cleric"]) {
        Archetype::Healing
    } else if has(&["mage", "wizard"]) {
        Archetype::Support
    } else if has(&["warrior", "fighter"]) {
        Archetype::Aggressive
    } else if has(&["tank", "guardian"]) {
        Archetype::Defensive
    } else {
        Archetype::Adaptive
    }
}
